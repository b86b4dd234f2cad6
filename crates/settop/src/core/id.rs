use slotmap::new_key_type;

new_key_type! {
    /// Opaque identifier for an element stored in the tree arena.
    pub struct ElementId;
}
