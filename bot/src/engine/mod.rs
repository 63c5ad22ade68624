pub mod events;
pub mod family_tree;
pub mod invite;
pub mod membership;
pub mod registry;
pub mod tree_node;
pub mod tree_view;
pub mod validation;
