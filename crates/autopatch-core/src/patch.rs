//! Patch application onto a private copy of the project tree.
//!
//! The applicator never touches the tree it is given: it copies the project
//! into a scratch directory and applies the plan there, so a failed or
//! partially-applied plan cannot corrupt the source being analyzed. Line
//! ranges on changes are advisory metadata; application always replaces the
//! whole file.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info};

use crate::domain::change::{ChangeType, ProposedChange};
use crate::domain::error::{AutopatchError, Result};
use crate::domain::plan::ModificationPlan;

/// Directory names never copied into the scratch tree.
const SKIPPED_DIRS: &[&str] = &["target", "node_modules", "__pycache__"];

/// A plan materialized onto a scratch copy of the project.
///
/// Owns the scratch directory; dropping the value removes the tree.
#[derive(Debug)]
pub struct PatchedTree {
    dir: TempDir,
    applied: Vec<String>,
}

impl PatchedTree {
    /// Root of the patched copy.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Ids of the changes applied, in application order.
    pub fn applied_changes(&self) -> &[String] {
        &self.applied
    }
}

/// Apply a dependency-sorted plan to a scratch copy of `project_root`.
///
/// The first failing change aborts the remaining changes; the error names
/// the change and the reason. The scratch tree of a failed application is
/// discarded with the error.
pub fn apply_plan(plan: &ModificationPlan, project_root: &Path) -> Result<PatchedTree> {
    if !plan.dependencies_sorted {
        return Err(AutopatchError::InvalidPlan(
            "plan must be dependency-sorted before application".to_string(),
        ));
    }
    plan.validate()?;

    let dir = tempfile::Builder::new().prefix("autopatch-").tempdir()?;
    copy_tree(project_root, dir.path())?;
    debug!(scratch = %dir.path().display(), "copied project to scratch tree");

    let mut applied = Vec::with_capacity(plan.changes.len());
    for change in &plan.changes {
        apply_change(dir.path(), change)?;
        applied.push(change.id.clone());
    }

    info!(
        changes = applied.len(),
        files = plan.files_affected(),
        "plan applied to scratch tree"
    );
    Ok(PatchedTree { dir, applied })
}

/// Apply one change inside `root`.
fn apply_change(root: &Path, change: &ProposedChange) -> Result<()> {
    let target = resolve_target(root, &change.file_path, change)?;

    match change.change_type {
        ChangeType::Create => {
            if target.exists() {
                return Err(fail(change, "target already exists"));
            }
            write_file(&target, content_of(change)?).map_err(|e| fail(change, &e.to_string()))?;
        }
        ChangeType::Modify | ChangeType::Refactor => {
            if !target.is_file() {
                return Err(fail(change, "target file does not exist"));
            }
            write_file(&target, content_of(change)?).map_err(|e| fail(change, &e.to_string()))?;
        }
        ChangeType::Delete => {
            // Idempotent: deleting an absent file is not an error.
            if target.is_file() {
                fs::remove_file(&target).map_err(|e| fail(change, &e.to_string()))?;
            }
        }
        ChangeType::Rename => {
            if !target.exists() {
                return Err(fail(change, "rename source does not exist"));
            }
            let dest_rel = content_of(change)?;
            let dest = resolve_target(root, dest_rel, change)?;
            if dest.exists() {
                return Err(fail(change, "rename destination already exists"));
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| fail(change, &e.to_string()))?;
            }
            fs::rename(&target, &dest).map_err(|e| fail(change, &e.to_string()))?;
        }
    }

    debug!(change = %change.id, file = %change.file_path, "change applied");
    Ok(())
}

fn content_of(change: &ProposedChange) -> Result<&str> {
    change
        .new_content
        .as_deref()
        .ok_or_else(|| fail(change, "missing new_content"))
}

fn fail(change: &ProposedChange, reason: &str) -> AutopatchError {
    AutopatchError::PatchApplication {
        change_id: change.id.clone(),
        file_path: change.file_path.clone(),
        reason: reason.to_string(),
    }
}

/// Resolve a plan-relative path inside the scratch root, rejecting anything
/// that would escape it. Plans are model output; they do not get to write
/// outside their sandbox.
fn resolve_target(root: &Path, relative: &str, change: &ProposedChange) -> Result<PathBuf> {
    let rel = Path::new(relative);
    if rel.is_absolute() {
        return Err(fail(change, "absolute paths are not allowed"));
    }
    for component in rel.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(fail(change, "path escapes the project root")),
        }
    }
    Ok(root.join(rel))
}

fn write_file(target: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, content)
}

/// Recursively copy a project tree, skipping hidden entries and build
/// artifact directories.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();

        if name_str.starts_with('.') || SKIPPED_DIRS.contains(&name_str.as_ref()) {
            continue;
        }

        let from = entry.path();
        let to = dst.join(&name);
        if from.is_dir() {
            fs::create_dir_all(&to)?;
            copy_tree(&from, &to)?;
        } else if from.is_file() {
            fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::change::Complexity;
    use crate::order::sort_plan;

    fn sorted_plan(changes: Vec<ProposedChange>) -> ModificationPlan {
        let plan = ModificationPlan::new(changes, "test plan", Complexity::Simple);
        sort_plan(plan).expect("sort failed")
    }

    fn project_with(files: &[(&str, &str)]) -> TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        for (path, content) in files {
            let full = dir.path().join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).expect("mkdir");
            }
            fs::write(full, content).expect("write");
        }
        dir
    }

    fn list_files(root: &Path) -> Vec<String> {
        fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
            for entry in fs::read_dir(dir).expect("read_dir") {
                let entry = entry.expect("entry");
                let path = entry.path();
                if path.is_dir() {
                    walk(root, &path, out);
                } else {
                    out.push(
                        path.strip_prefix(root)
                            .expect("prefix")
                            .to_string_lossy()
                            .to_string(),
                    );
                }
            }
        }
        let mut out = Vec::new();
        walk(root, root, &mut out);
        out.sort();
        out
    }

    #[test]
    fn test_create_materializes_exact_lines() {
        let project = project_with(&[("README.md", "demo")]);
        let plan = sorted_plan(vec![ProposedChange::new(
            "c1",
            "src/Foo.ext",
            ChangeType::Create,
            "add foo",
        )
        .with_content("line1\nline2")]);

        let tree = apply_plan(&plan, project.path()).expect("apply failed");

        let content = fs::read_to_string(tree.path().join("src/Foo.ext")).expect("read");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["line1", "line2"]);
        assert_eq!(tree.applied_changes(), &["c1".to_string()]);
    }

    #[test]
    fn test_create_rejects_existing_target() {
        let project = project_with(&[("src/foo.rs", "old")]);
        let plan = sorted_plan(vec![ProposedChange::new(
            "c1",
            "src/foo.rs",
            ChangeType::Create,
            "recreate",
        )
        .with_content("new")]);

        match apply_plan(&plan, project.path()) {
            Err(AutopatchError::PatchApplication { change_id, .. }) => {
                assert_eq!(change_id, "c1");
            }
            other => panic!("expected PatchApplication, got {:?}", other),
        }
    }

    #[test]
    fn test_modify_replaces_whole_file() {
        let project = project_with(&[("src/lib.rs", "fn old() {}")]);
        let plan = sorted_plan(vec![ProposedChange::new(
            "c1",
            "src/lib.rs",
            ChangeType::Modify,
            "rewrite",
        )
        .with_content("fn new() {}")
        .with_old_content("fn old() {}")]);

        let tree = apply_plan(&plan, project.path()).expect("apply failed");
        let content = fs::read_to_string(tree.path().join("src/lib.rs")).expect("read");
        assert_eq!(content, "fn new() {}");
        // The original tree is untouched.
        let original = fs::read_to_string(project.path().join("src/lib.rs")).expect("read");
        assert_eq!(original, "fn old() {}");
    }

    #[test]
    fn test_modify_requires_existing_file() {
        let project = project_with(&[]);
        let plan = sorted_plan(vec![ProposedChange::new(
            "c1",
            "src/missing.rs",
            ChangeType::Modify,
            "edit",
        )
        .with_content("x")
        .with_old_content("y")]);

        assert!(matches!(
            apply_plan(&plan, project.path()),
            Err(AutopatchError::PatchApplication { .. })
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let project = project_with(&[("keep.txt", "keep")]);
        let plan = sorted_plan(vec![ProposedChange::new(
            "c1",
            "not_there.txt",
            ChangeType::Delete,
            "remove stale file",
        )]);

        let tree = apply_plan(&plan, project.path()).expect("apply failed");
        assert!(tree.path().join("keep.txt").is_file());
    }

    #[test]
    fn test_create_then_delete_roundtrips() {
        let project = project_with(&[("src/main.rs", "fn main() {}")]);
        let plan = sorted_plan(vec![
            ProposedChange::new("c1", "src/tmp.rs", ChangeType::Create, "scratch file")
                .with_content("tmp"),
            ProposedChange::new("c2", "src/tmp.rs", ChangeType::Delete, "drop it")
                .with_depends_on(vec!["c1".to_string()]),
        ]);

        let tree = apply_plan(&plan, project.path()).expect("apply failed");
        assert_eq!(list_files(tree.path()), list_files(project.path()));
    }

    #[test]
    fn test_rename_moves_file() {
        let project = project_with(&[("src/old_name.rs", "content")]);
        let plan = sorted_plan(vec![ProposedChange::new(
            "c1",
            "src/old_name.rs",
            ChangeType::Rename,
            "move into module",
        )
        .with_content("src/module/new_name.rs")]);

        let tree = apply_plan(&plan, project.path()).expect("apply failed");
        assert!(!tree.path().join("src/old_name.rs").exists());
        let content =
            fs::read_to_string(tree.path().join("src/module/new_name.rs")).expect("read");
        assert_eq!(content, "content");
    }

    #[test]
    fn test_path_escape_rejected() {
        let project = project_with(&[]);
        let plan = sorted_plan(vec![ProposedChange::new(
            "c1",
            "../outside.txt",
            ChangeType::Create,
            "escape attempt",
        )
        .with_content("nope")]);

        match apply_plan(&plan, project.path()) {
            Err(AutopatchError::PatchApplication { reason, .. }) => {
                assert!(reason.contains("escapes"));
            }
            other => panic!("expected PatchApplication, got {:?}", other),
        }
    }

    #[test]
    fn test_unsorted_plan_rejected() {
        let project = project_with(&[]);
        let plan = ModificationPlan::new(
            vec![ProposedChange::new("c1", "a.txt", ChangeType::Delete, "drop")],
            "unsorted",
            Complexity::Simple,
        );
        assert!(matches!(
            apply_plan(&plan, project.path()),
            Err(AutopatchError::InvalidPlan(_))
        ));
    }

    #[test]
    fn test_failure_aborts_remaining_changes() {
        let project = project_with(&[]);
        let plan = sorted_plan(vec![
            ProposedChange::new("c1", "a.txt", ChangeType::Create, "first").with_content("a"),
            ProposedChange::new("c2", "missing.rs", ChangeType::Modify, "will fail")
                .with_content("x")
                .with_old_content("y")
                .with_depends_on(vec!["c1".to_string()]),
            ProposedChange::new("c3", "b.txt", ChangeType::Create, "never applied")
                .with_content("b")
                .with_depends_on(vec!["c2".to_string()]),
        ]);

        match apply_plan(&plan, project.path()) {
            Err(AutopatchError::PatchApplication { change_id, .. }) => {
                assert_eq!(change_id, "c2");
            }
            other => panic!("expected PatchApplication, got {:?}", other),
        }
    }

    #[test]
    fn test_copy_skips_artifacts_and_hidden() {
        let project = project_with(&[
            ("src/main.rs", "fn main() {}"),
            ("target/debug/bin", "binary"),
            (".git/HEAD", "ref"),
            ("node_modules/pkg/index.js", "js"),
        ]);
        let plan = sorted_plan(vec![ProposedChange::new(
            "c1",
            "note.txt",
            ChangeType::Create,
            "marker",
        )
        .with_content("x")]);

        let tree = apply_plan(&plan, project.path()).expect("apply failed");
        assert!(tree.path().join("src/main.rs").is_file());
        assert!(!tree.path().join("target").exists());
        assert!(!tree.path().join(".git").exists());
        assert!(!tree.path().join("node_modules").exists());
    }
}
