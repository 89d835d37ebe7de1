use crate::error::VcsError;
use crate::git::{CommitOutcome, ContentSource, VcsResult, VersionControl};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// File tree of one commit: path -> content
pub type Snapshot = BTreeMap<String, String>;

/// Operations that can be made to fail on purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    FetchAll,
    Checkout,
    RemoteBranchExists,
    FetchBranch,
    CreateBranch,
    CheckoutBranch,
    WriteFile,
    StageFile,
    Commit,
    CreateTag,
    Push,
}

#[derive(Debug, Clone)]
enum Head {
    Unset,
    Detached(Snapshot),
    Branch(String),
}

/// In-memory repository for testing without actual git operations.
///
/// Commits are whole-tree snapshots; there is no history, only branch tips.
/// The "remote" is a second set of branches and tags that only `push` writes to.
#[derive(Debug, Clone)]
pub struct MockBackend {
    remote_branches: HashMap<String, Snapshot>,
    remote_tags: HashMap<String, Snapshot>,
    local_branches: HashMap<String, Snapshot>,
    tags: HashMap<String, Snapshot>,
    head: Head,
    worktree: Snapshot,
    staged: BTreeSet<String>,
    commits: Vec<String>,
    pushes: Vec<(String, Vec<String>)>,
    calls: Vec<MockOperation>,
    failures: HashSet<MockOperation>,
}

impl MockBackend {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        MockBackend {
            remote_branches: HashMap::new(),
            remote_tags: HashMap::new(),
            local_branches: HashMap::new(),
            tags: HashMap::new(),
            head: Head::Unset,
            worktree: Snapshot::new(),
            staged: BTreeSet::new(),
            commits: Vec::new(),
            pushes: Vec::new(),
            calls: Vec::new(),
            failures: HashSet::new(),
        }
    }

    /// Add a branch on the remote with the given files
    pub fn add_remote_branch<I, K, V>(&mut self, name: impl Into<String>, files: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let snapshot = files
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.remote_branches.insert(name.into(), snapshot);
    }

    /// Add a tag on the remote pointing at a copy of a remote branch tip
    pub fn add_remote_tag(&mut self, name: impl Into<String>, branch: &str) {
        let snapshot = self.remote_branches.get(branch).cloned().unwrap_or_default();
        self.remote_tags.insert(name.into(), snapshot);
    }

    /// Make every subsequent call of `op` fail
    pub fn fail_on(&mut self, op: MockOperation) {
        self.failures.insert(op);
    }

    pub fn clear_failure(&mut self, op: MockOperation) {
        self.failures.remove(&op);
    }

    pub fn remote_branch(&self, name: &str) -> Option<&Snapshot> {
        self.remote_branches.get(name)
    }

    pub fn local_branch(&self, name: &str) -> Option<&Snapshot> {
        self.local_branches.get(name)
    }

    pub fn remote_tag(&self, name: &str) -> Option<&Snapshot> {
        self.remote_tags.get(name)
    }

    pub fn local_tag(&self, name: &str) -> Option<&Snapshot> {
        self.tags.get(name)
    }

    /// Messages of all commits written, oldest first
    pub fn commit_messages(&self) -> &[String] {
        &self.commits
    }

    /// Every push as (branch, tags)
    pub fn pushes(&self) -> &[(String, Vec<String>)] {
        &self.pushes
    }

    /// Mutating operations in call order
    pub fn calls(&self) -> &[MockOperation] {
        &self.calls
    }

    pub fn current_branch(&self) -> Option<&str> {
        match &self.head {
            Head::Branch(name) => Some(name),
            _ => None,
        }
    }

    fn check(&self, op: MockOperation) -> VcsResult<()> {
        if !self.failures.contains(&op) {
            return Ok(());
        }
        let msg = format!("injected failure in {:?}", op);
        if op == MockOperation::Push {
            Err(VcsError::remote(msg))
        } else {
            Err(VcsError::backend(msg))
        }
    }

    fn record(&mut self, op: MockOperation) -> VcsResult<()> {
        self.calls.push(op);
        self.check(op)
    }

    fn head_snapshot(&self) -> Snapshot {
        match &self.head {
            Head::Unset => Snapshot::new(),
            Head::Detached(snapshot) => snapshot.clone(),
            Head::Branch(name) => self.local_branches.get(name).cloned().unwrap_or_default(),
        }
    }

    fn resolve(&self, rev: &str) -> Option<&Snapshot> {
        let short = rev.strip_prefix("refs/heads/").unwrap_or(rev);
        self.remote_branches
            .get(short)
            .or_else(|| self.local_branches.get(short))
            .or_else(|| self.tags.get(short))
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentSource for MockBackend {
    fn read_file(&self, rev: &str, path: &str) -> VcsResult<Option<String>> {
        Ok(self.resolve(rev).and_then(|snapshot| snapshot.get(path).cloned()))
    }

    fn list_files(&self, rev: &str) -> VcsResult<Vec<String>> {
        Ok(self
            .resolve(rev)
            .map(|snapshot| snapshot.keys().cloned().collect())
            .unwrap_or_default())
    }
}

impl VersionControl for MockBackend {
    fn fetch_all(&mut self) -> VcsResult<()> {
        self.record(MockOperation::FetchAll)?;
        for (name, snapshot) in &self.remote_tags {
            self.tags
                .entry(name.clone())
                .or_insert_with(|| snapshot.clone());
        }
        Ok(())
    }

    fn checkout(&mut self, rev: &str) -> VcsResult<()> {
        self.record(MockOperation::Checkout)?;
        let snapshot = self
            .resolve(rev)
            .cloned()
            .ok_or_else(|| VcsError::RefNotFound(rev.to_string()))?;
        self.worktree = snapshot.clone();
        self.head = Head::Detached(snapshot);
        self.staged.clear();
        Ok(())
    }

    fn remote_branch_exists(&self, name: &str) -> VcsResult<bool> {
        self.check(MockOperation::RemoteBranchExists)?;
        Ok(self.remote_branches.contains_key(name))
    }

    fn fetch_branch(&mut self, name: &str) -> VcsResult<()> {
        self.record(MockOperation::FetchBranch)?;
        let snapshot = self
            .remote_branches
            .get(name)
            .cloned()
            .ok_or_else(|| VcsError::RefNotFound(name.to_string()))?;
        self.local_branches.insert(name.to_string(), snapshot);
        Ok(())
    }

    fn local_branch_exists(&self, name: &str) -> VcsResult<bool> {
        Ok(self.local_branches.contains_key(name))
    }

    fn create_branch(&mut self, name: &str) -> VcsResult<()> {
        self.record(MockOperation::CreateBranch)?;
        if self.local_branches.contains_key(name) {
            return Err(VcsError::BranchExists(name.to_string()));
        }
        let snapshot = self.head_snapshot();
        self.local_branches.insert(name.to_string(), snapshot);
        Ok(())
    }

    fn checkout_branch(&mut self, name: &str) -> VcsResult<()> {
        self.record(MockOperation::CheckoutBranch)?;
        let snapshot = self
            .local_branches
            .get(name)
            .cloned()
            .ok_or_else(|| VcsError::RefNotFound(name.to_string()))?;
        self.worktree = snapshot;
        self.head = Head::Branch(name.to_string());
        self.staged.clear();
        Ok(())
    }

    fn write_file(&mut self, path: &str, content: &str) -> VcsResult<()> {
        self.record(MockOperation::WriteFile)?;
        self.worktree.insert(path.to_string(), content.to_string());
        Ok(())
    }

    fn stage_file(&mut self, path: &str) -> VcsResult<()> {
        self.record(MockOperation::StageFile)?;
        self.staged.insert(path.to_string());
        Ok(())
    }

    fn commit(&mut self, message: &str, allow_noop: bool) -> VcsResult<CommitOutcome> {
        self.record(MockOperation::Commit)?;
        let current = self.head_snapshot();
        let mut next = current.clone();
        for path in &self.staged {
            match self.worktree.get(path) {
                Some(content) => next.insert(path.clone(), content.clone()),
                None => next.remove(path),
            };
        }
        self.staged.clear();

        if next == current {
            return if allow_noop {
                Ok(CommitOutcome::NothingToCommit)
            } else {
                Err(VcsError::NothingToCommit)
            };
        }

        match &self.head {
            Head::Branch(name) => {
                self.local_branches.insert(name.clone(), next);
            }
            _ => self.head = Head::Detached(next),
        }
        self.commits.push(message.to_string());
        Ok(CommitOutcome::Committed {
            id: format!("mock-{}", self.commits.len()),
        })
    }

    fn tag_exists(&self, name: &str) -> VcsResult<bool> {
        Ok(self.tags.contains_key(name))
    }

    fn create_tag(&mut self, name: &str, _message: &str) -> VcsResult<()> {
        self.record(MockOperation::CreateTag)?;
        if self.tags.contains_key(name) {
            return Err(VcsError::TagExists(name.to_string()));
        }
        let snapshot = self.head_snapshot();
        self.tags.insert(name.to_string(), snapshot);
        Ok(())
    }

    fn push(&mut self, branch: &str, tags: &[&str]) -> VcsResult<()> {
        self.record(MockOperation::Push)?;
        let tip = self
            .local_branches
            .get(branch)
            .cloned()
            .ok_or_else(|| VcsError::RefNotFound(branch.to_string()))?;

        for tag in tags {
            let local = self
                .tags
                .get(*tag)
                .ok_or_else(|| VcsError::RefNotFound(tag.to_string()))?;
            if let Some(remote) = self.remote_tags.get(*tag) {
                if remote != local {
                    return Err(VcsError::remote(format!(
                        "tag '{}' already exists on the remote with a different target",
                        tag
                    )));
                }
            }
        }

        self.remote_branches.insert(branch.to_string(), tip);
        for tag in tags {
            if let Some(local) = self.tags.get(*tag) {
                self.remote_tags.insert(tag.to_string(), local.clone());
            }
        }
        self.pushes.push((
            branch.to_string(),
            tags.iter().map(|t| t.to_string()).collect(),
        ));
        Ok(())
    }
}
