use serde::{Deserialize, Serialize};

/// Identifies an entity (source, sink or visual) within one compiled run.
///
/// Ids are allocated sequentially from 0 in creation order and double as the
/// entity's index in the graph's entity list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Identifies a transport link. Sequential within links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkId(pub u32);

/// Identifies a product. Sequential within products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub u32);

macro_rules! impl_index {
    ($($ty:ident),*) => {
        $(
            impl $ty {
                /// Position of this id in its owning collection.
                #[inline]
                pub fn index(self) -> usize {
                    self.0 as usize
                }
            }

            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

impl_index!(EntityId, LinkId, ProductId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_raw_value() {
        assert_eq!(EntityId(3).index(), 3);
        assert_eq!(LinkId(0).index(), 0);
        assert_eq!(ProductId(7).index(), 7);
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(EntityId(0), "machine");
        map.insert(EntityId(1), "stock");
        assert_eq!(map[&EntityId(1)], "stock");
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&EntityId(4)).unwrap();
        assert_eq!(json, "4");
    }
}
