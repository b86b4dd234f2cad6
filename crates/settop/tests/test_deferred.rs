//! Integration tests for scene-owned asynchronous work.

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use settop::{
        ElementId, Scene, SceneContext,
        deferred::{Cancellable, DeferredSet, Outcome, State},
        error::{Error, Result},
        router::RouterConfig,
        testing::{
            harness::Harness,
            probe::{Journal, Probe},
        },
        tree::Tree,
    };

    /// A feed list that "fetches" its items with a timer on every activation
    /// and abandons the fetch when the user leaves.
    struct Feeds {
        journal: Journal,
        status: Option<ElementId>,
        cancel_on_deactivate: bool,
    }

    impl Feeds {
        fn new(journal: &Journal, cancel_on_deactivate: bool) -> Self {
            Self {
                journal: journal.clone(),
                status: None,
                cancel_on_deactivate,
            }
        }
    }

    impl Scene for Feeds {
        fn create(&mut self, tree: &mut Tree, parent: ElementId, name: &str) -> Result<ElementId> {
            let root = tree.add_container(parent, name)?;
            self.status = Some(tree.add_text(root, "status", "idle")?);
            tree.add_button(root, "refresh", "Refresh")?;
            Ok(root)
        }

        fn activate(&mut self, ctx: &SceneContext<'_>) -> Result<()> {
            let status = self.status.ok_or(Error::Internal("no status".into()))?;
            ctx.tree_mut().set_label(status, "loading")?;
            let fetch = ctx.deferreds().timeout(ctx.scheduler(), 500);
            let (tree, journal) = (ctx.tree_handle(), self.journal.clone());
            fetch.then(move |outcome: &Outcome<u64>| {
                let label = if outcome.is_resolved() { "loaded" } else { "cancelled" };
                journal.push(label);
                if outcome.is_resolved()
                    && let Err(e) = tree.borrow_mut().set_label(status, label)
                {
                    journal.push(e.to_string());
                }
            });
            Ok(())
        }

        fn deactivate(&mut self, ctx: &SceneContext<'_>) -> Result<()> {
            if self.cancel_on_deactivate {
                let n = ctx.reject_all();
                self.journal.push(format!("rejected {n}"));
            }
            Ok(())
        }
    }

    fn setup(cancel_on_deactivate: bool, config: RouterConfig) -> Result<(Harness, Journal)> {
        let journal = Journal::new();
        let mut h = Harness::with_config(config);
        h.app
            .add_scene("feeds", Feeds::new(&journal, cancel_on_deactivate))?;
        h.app.add_scene("info", Probe::new(&journal).button("ok"))?;
        Ok((h, journal))
    }

    fn status_label(h: &Harness) -> Result<String> {
        let tree = h.app.tree();
        let el = tree
            .find(tree.root(), "status")
            .ok_or(Error::Internal("status".into()))?;
        Ok(tree.element(el)?.label().to_string())
    }

    #[test]
    fn fetch_completes_while_active() -> Result<()> {
        let (mut h, journal) = setup(true, RouterConfig::default())?;
        h.app.go("feeds")?;
        assert_eq!(status_label(&h)?, "loading");
        assert_eq!(h.app.router().pending("feeds"), 1);
        h.wait(499)?;
        assert_eq!(status_label(&h)?, "loading");
        h.wait(1)?;
        assert_eq!(status_label(&h)?, "loaded");
        assert_eq!(journal.entries(), vec!["loaded"]);
        assert_eq!(h.app.router().pending("feeds"), 0);
        Ok(())
    }

    #[test]
    fn leaving_rejects_pending_fetch() -> Result<()> {
        let (mut h, journal) = setup(true, RouterConfig::default())?;
        h.app.go("feeds")?;
        h.wait(200)?;
        h.app.go("info")?;
        assert_eq!(journal.take(), journal_order());
        h.wait(1000)?;
        assert_eq!(status_label(&h)?, "loading");
        assert!(journal.entries().is_empty());
        Ok(())
    }

    /// Entries expected when leaving the feeds scene mid-fetch.
    fn journal_order() -> Vec<String> {
        [
            "info:create",
            "info:init",
            "cancelled",
            "rejected 1",
            "info:activate",
            "info:render",
        ]
        .map(String::from)
        .to_vec()
    }

    #[test]
    fn router_can_cancel_on_leave() -> Result<()> {
        let (mut h, journal) = setup(
            false,
            RouterConfig {
                cancel_on_leave: true,
            },
        )?;
        h.app.go("feeds")?;
        h.app.go("info")?;
        assert!(journal.entries().contains(&"cancelled".to_string()));
        assert_eq!(h.app.router().pending("feeds"), 0);

        // Coming back starts a fresh fetch that completes normally.
        journal.take();
        h.app.go_back()?;
        h.wait(500)?;
        assert_eq!(status_label(&h)?, "loaded");
        assert!(journal.entries().ends_with(&["loaded".to_string()]));
        Ok(())
    }

    #[test]
    fn settled_work_is_not_rejected() -> Result<()> {
        let (mut h, journal) = setup(true, RouterConfig::default())?;
        h.app.go("feeds")?;
        h.wait(500)?;
        h.app.go("info")?;
        assert!(journal.entries().contains(&"rejected 0".to_string()));
        assert_eq!(journal.count("cancelled"), 0);
        Ok(())
    }

    #[test]
    fn aggregate_of_scene_work() -> Result<()> {
        let (mut h, _) = setup(false, RouterConfig::default())?;
        let scheduler = h.app.scheduler().clone();
        let set = DeferredSet::new();
        let a = set.timeout(&scheduler, 10);
        let b = set.lag(&scheduler, || {});
        let total = set.all(&[&a, &b]);
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        total.then(move |o: &Outcome<usize>| *s.borrow_mut() = Some(o.clone()));
        h.app.tick()?;
        assert_eq!(total.state(), State::Pending);
        h.wait(10)?;
        assert_eq!(*seen.borrow(), Some(Outcome::Resolved(Some(2))));
        assert_eq!(set.reject_all(), 0);
        Ok(())
    }
}
