//! The computed plan and the confirmation seam

use std::path::PathBuf;

/// Files to copy and files to delete, fixed once built
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    to_copy: Vec<PathBuf>,
    to_delete: Vec<PathBuf>,
}

impl SyncPlan {
    /// Create a plan from relative copy paths and absolute delete paths
    #[must_use]
    pub fn new(to_copy: Vec<PathBuf>, to_delete: Vec<PathBuf>) -> Self {
        Self { to_copy, to_delete }
    }

    /// Paths relative to both roots, in the order they will be copied
    #[must_use]
    pub fn to_copy(&self) -> &[PathBuf] {
        &self.to_copy
    }

    /// Absolute destination paths, in the order they will be removed
    #[must_use]
    pub fn to_delete(&self) -> &[PathBuf] {
        &self.to_delete
    }

    /// Check if there are any changes to sync
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_copy.is_empty() && self.to_delete.is_empty()
    }

    /// Total number of operations
    #[must_use]
    pub fn total_operations(&self) -> usize {
        self.to_copy.len() + self.to_delete.len()
    }
}

/// Decides whether a computed plan gets applied
///
/// Implementations own all presentation: printing the lists, prompting,
/// reading a flag. Returning `false` means nothing is touched.
pub trait Confirm {
    fn confirm(&mut self, plan: &SyncPlan) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&SyncPlan) -> bool,
{
    fn confirm(&mut self, plan: &SyncPlan) -> bool {
        self(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_plan() {
        let plan = SyncPlan::default();
        assert!(plan.is_empty());
        assert_eq!(plan.total_operations(), 0);
    }

    #[test]
    fn test_plan_counts() {
        let plan = SyncPlan::new(
            vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")],
            vec![PathBuf::from("/out/c.txt")],
        );
        assert!(!plan.is_empty());
        assert_eq!(plan.total_operations(), 3);
        assert_eq!(plan.to_copy()[1], PathBuf::from("b.txt"));
        assert_eq!(plan.to_delete(), &[PathBuf::from("/out/c.txt")]);
    }

    #[test]
    fn test_closure_confirm() {
        let plan = SyncPlan::new(vec![PathBuf::from("a.txt")], Vec::new());
        let mut seen = 0;
        let mut confirm = |p: &SyncPlan| {
            seen = p.total_operations();
            false
        };
        assert!(!confirm.confirm(&plan));
        assert_eq!(seen, 1);
    }
}
