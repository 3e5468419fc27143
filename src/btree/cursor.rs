//! Ordered iteration over a B+-tree's leaf chain (`spec.md` §4.4 *Scan*).

use crate::btree::node::Node;
use crate::buffer::BufferPoolManager;
use crate::error::Result;
use crate::record::Rid;
use crate::types::PageId;

/// Walks the doubly-linked leaf chain from the leftmost leaf, yielding
/// `(key, rid)` pairs in ascending key order.
pub struct Cursor<'a> {
    pool: &'a BufferPoolManager,
    leaf: Option<Node>,
    idx: usize,
}

impl<'a> Cursor<'a> {
    pub(super) fn new(pool: &'a BufferPoolManager, leftmost_leaf: Option<PageId>) -> Result<Self> {
        let leaf = match leftmost_leaf {
            Some(id) => Some(read_node(pool, id)?),
            None => None,
        };
        Ok(Self { pool, leaf, idx: 0 })
    }
}

fn read_node(pool: &BufferPoolManager, id: PageId) -> Result<Node> {
    let guard = pool.pin_page(id)?;
    let node = Node::deserialize(id, &guard.read());
    node
}

impl<'a> Iterator for Cursor<'a> {
    type Item = Result<(i32, Rid)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let leaf = self.leaf.as_ref()?;
            if self.idx < leaf.keys.len() {
                let item = (leaf.keys[self.idx], leaf.rids[self.idx]);
                self.idx += 1;
                return Some(Ok(item));
            }
            match leaf.next {
                Some(next_id) => {
                    match read_node(self.pool, next_id) {
                        Ok(node) => {
                            self.leaf = Some(node);
                            self.idx = 0;
                        }
                        Err(e) => {
                            self.leaf = None;
                            return Some(Err(e));
                        }
                    }
                }
                None => {
                    self.leaf = None;
                    return None;
                }
            }
        }
    }
}
