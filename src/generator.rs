//! Synthetic threads for fixtures and demos.

use rand::RngCore;

use crate::error::Result;
use crate::thread::{NewComment, Thread};

/// Shape of a generated thread.
#[derive(Debug, Clone, Copy)]
pub struct Shape {
    /// Top-level comments
    pub count: usize,
    /// Replies per comment below the top level
    pub children: usize,
    /// Deepest reply level
    pub depth: usize,
}

impl Default for Shape {
    fn default() -> Self {
        Shape {
            count: 2,
            children: 1,
            depth: 2,
        }
    }
}

/// Adds comments named `parent-0-<n>` / `child-<level>-<n>` with one shared order counter.
pub struct Generator<'a, R> {
    thread: &'a mut Thread<R>,
    counter: u64,
}

impl<'a, R: RngCore> Generator<'a, R> {
    pub fn new(thread: &'a mut Thread<R>) -> Self {
        let counter = thread.next_order();
        Generator { thread, counter }
    }

    fn next_order(&mut self) -> u64 {
        let order = self.counter;
        self.counter += 1;
        order
    }

    /// Populate the thread, returning the identifiers added in creation order.
    pub fn generate(&mut self, shape: Shape) -> Result<Vec<String>> {
        let mut added = Vec::new();
        for _ in 0..shape.count {
            let order = self.next_order();
            let uid = format!("parent-0-{}", order);
            self.thread.add(NewComment {
                uid: Some(uid.clone()),
                order: Some(order),
                ..Default::default()
            })?;
            added.push(uid.clone());
            self.replies(&uid, 1, shape, &mut added)?;
        }
        Ok(added)
    }

    fn replies(
        &mut self,
        parent: &str,
        level: usize,
        shape: Shape,
        added: &mut Vec<String>,
    ) -> Result<()> {
        if level > shape.depth {
            return Ok(());
        }
        for _ in 0..shape.children {
            let order = self.next_order();
            let uid = format!("child-{}-{}", level, order);
            self.thread.add(NewComment {
                uid: Some(uid.clone()),
                parent: Some(parent.to_string()),
                order: Some(order),
            })?;
            added.push(uid.clone());
            self.replies(&uid, level + 1, shape, added)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[test]
    fn test_generate_default_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let mut thread = Thread::new("demo", Store::new(tmp.path(), ".md"));

        let added = Generator::new(&mut thread).generate(Shape::default()).unwrap();

        assert_eq!(
            added,
            vec![
                "parent-0-0",
                "child-1-1",
                "child-2-2",
                "parent-0-3",
                "child-1-4",
                "child-2-5"
            ]
        );
        let order: Vec<&str> = thread.iter().map(|c| c.uid()).collect();
        assert_eq!(order, added.iter().map(String::as_str).collect::<Vec<_>>());
        let levels: Vec<usize> = thread.iter().map(|c| c.level()).collect();
        assert_eq!(levels, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_generate_wide() {
        let tmp = tempfile::tempdir().unwrap();
        let mut thread = Thread::new("demo", Store::new(tmp.path(), ".md"));

        let shape = Shape {
            count: 3,
            children: 2,
            depth: 2,
        };
        let added = Generator::new(&mut thread).generate(shape).unwrap();

        // 3 * (1 + 2 + 4)
        assert_eq!(added.len(), 21);
        assert_eq!(thread.len(), 21);
        assert_eq!(thread.next_order(), 21);
    }
}
