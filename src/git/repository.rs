use crate::config::CommitterIdentity;
use crate::error::VcsError;
use crate::git::{CommitOutcome, ContentSource, VcsResult, VersionControl};
use git2::build::CheckoutBuilder;
use git2::{
    BranchType, Commit, Direction, ErrorCode, FetchOptions, ObjectType, PushOptions,
    RemoteCallbacks, Repository, Signature, TreeWalkMode, TreeWalkResult,
};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Backend {
    repo: Repository,
    remote: String,
    identity: Option<CommitterIdentity>,
}

impl Git2Backend {
    /// Open or discover a git repository, talking to `remote` for fetch and push
    pub fn open<P: AsRef<Path>>(path: P, remote: impl Into<String>) -> VcsResult<Self> {
        let repo = Repository::discover(path)?;

        Ok(Git2Backend::from_git2(repo, remote))
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Repository, remote: impl Into<String>) -> Self {
        Git2Backend {
            repo,
            remote: remote.into(),
            identity: None,
        }
    }

    /// Use a fixed committer instead of the repository's `user.name`/`user.email`
    pub fn with_identity(mut self, identity: Option<CommitterIdentity>) -> Self {
        self.identity = identity;
        self
    }

    fn signature(&self) -> VcsResult<Signature<'static>> {
        match &self.identity {
            Some(identity) => Ok(Signature::now(&identity.name, &identity.email)?),
            None => Ok(self.repo.signature()?),
        }
    }

    /// Resolve a ref: remote-tracking branch, then local branch, then any rev-spec
    fn resolve_commit(&self, rev: &str) -> Option<Commit<'_>> {
        let short = rev.strip_prefix("refs/heads/").unwrap_or(rev);
        let candidates = [
            format!("refs/remotes/{}/{}", self.remote, short),
            format!("refs/heads/{}", short),
            rev.to_string(),
        ];

        for candidate in &candidates {
            if let Ok(object) = self.repo.revparse_single(candidate) {
                if let Ok(commit) = object.peel_to_commit() {
                    debug!(rev, resolved = %candidate, "resolved ref");
                    return Some(commit);
                }
            }
        }
        None
    }

    fn find_remote(&self) -> VcsResult<git2::Remote<'_>> {
        self.repo
            .find_remote(&self.remote)
            .map_err(|e| VcsError::remote(format!("Remote '{}' not found: {}", self.remote, e)))
    }
}

/// Credential lookup for fetch and push: SSH keys from ~/.ssh, then the SSH
/// agent, then libgit2's default credentials.
fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        let username = username_from_url.unwrap_or("git");

        if allowed_types.contains(git2::CredentialType::SSH_KEY) {
            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = git2::Cred::ssh_key(username, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }

            if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
        }

        git2::Cred::default()
    });
    callbacks
}

impl ContentSource for Git2Backend {
    fn read_file(&self, rev: &str, path: &str) -> VcsResult<Option<String>> {
        let commit = match self.resolve_commit(rev) {
            Some(commit) => commit,
            None => return Ok(None),
        };
        let tree = commit.tree()?;

        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let object = entry.to_object(&self.repo)?;
        match object.as_blob() {
            Some(blob) => Ok(Some(String::from_utf8_lossy(blob.content()).into_owned())),
            // a directory at that path
            None => Ok(None),
        }
    }

    fn list_files(&self, rev: &str) -> VcsResult<Vec<String>> {
        let commit = match self.resolve_commit(rev) {
            Some(commit) => commit,
            None => return Ok(Vec::new()),
        };
        let tree = commit.tree()?;

        let mut files = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |dir, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    files.push(format!("{}{}", dir, name));
                }
            }
            TreeWalkResult::Ok
        })?;
        Ok(files)
    }
}

impl VersionControl for Git2Backend {
    fn fetch_all(&mut self) -> VcsResult<()> {
        let mut remote = self.find_remote()?;
        let mut options = FetchOptions::new();
        options.remote_callbacks(remote_callbacks());

        let heads = format!("+refs/heads/*:refs/remotes/{}/*", self.remote);
        remote
            .fetch(
                &[heads.as_str(), "+refs/tags/*:refs/tags/*"],
                Some(&mut options),
                None,
            )
            .map_err(|e| {
                VcsError::remote(format!("Failed to fetch from '{}': {}", self.remote, e))
            })?;

        Ok(())
    }

    fn checkout(&mut self, rev: &str) -> VcsResult<()> {
        let commit = self
            .resolve_commit(rev)
            .ok_or_else(|| VcsError::RefNotFound(rev.to_string()))?;

        let mut builder = CheckoutBuilder::new();
        builder.force();
        self.repo
            .checkout_tree(commit.as_object(), Some(&mut builder))?;
        self.repo.set_head_detached(commit.id())?;

        Ok(())
    }

    fn remote_branch_exists(&self, name: &str) -> VcsResult<bool> {
        let mut remote = self.find_remote()?;
        let connection = remote
            .connect_auth(Direction::Fetch, Some(remote_callbacks()), None)
            .map_err(|e| {
                VcsError::remote(format!("Cannot connect to '{}': {}", self.remote, e))
            })?;

        let wanted = format!("refs/heads/{}", name);
        let exists = connection.list()?.iter().any(|head| head.name() == wanted);

        Ok(exists)
    }

    fn fetch_branch(&mut self, name: &str) -> VcsResult<()> {
        let tracking = format!("refs/remotes/{}/{}", self.remote, name);
        {
            let mut remote = self.find_remote()?;
            let mut options = FetchOptions::new();
            options.remote_callbacks(remote_callbacks());

            let refspec = format!("+refs/heads/{}:{}", name, tracking);
            remote
                .fetch(&[refspec.as_str()], Some(&mut options), None)
                .map_err(|e| VcsError::remote(format!("Failed to fetch '{}': {}", name, e)))?;
        }

        let remote_oid = self
            .repo
            .refname_to_id(&tracking)
            .map_err(|_| VcsError::RefNotFound(tracking.clone()))?;

        match self.repo.find_branch(name, BranchType::Local) {
            Ok(branch) => {
                let local_oid = branch.get().target().ok_or_else(|| {
                    VcsError::backend(format!("Branch '{}' has no target", name))
                })?;

                if local_oid == remote_oid {
                    return Ok(());
                }

                if self.repo.graph_descendant_of(remote_oid, local_oid)? {
                    let mut reference = branch.into_reference();
                    reference.set_target(remote_oid, &format!("fast-forward from {}", tracking))?;
                } else {
                    warn!(branch = name, "local branch diverged from remote, keeping local");
                }
            }
            Err(e) if e.code() == ErrorCode::NotFound => {
                let commit = self.repo.find_commit(remote_oid)?;
                self.repo.branch(name, &commit, false)?;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    fn local_branch_exists(&self, name: &str) -> VcsResult<bool> {
        match self.repo.find_branch(name, BranchType::Local) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn create_branch(&mut self, name: &str) -> VcsResult<()> {
        let head = self.repo.head()?.peel_to_commit()?;

        match self.repo.branch(name, &head, false) {
            Ok(_) => Ok(()),
            Err(e) if e.code() == ErrorCode::Exists => Err(VcsError::BranchExists(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn checkout_branch(&mut self, name: &str) -> VcsResult<()> {
        let refname = format!("refs/heads/{}", name);
        let object = self
            .repo
            .revparse_single(&refname)
            .map_err(|_| VcsError::RefNotFound(name.to_string()))?;

        let mut builder = CheckoutBuilder::new();
        builder.force();
        self.repo.checkout_tree(&object, Some(&mut builder))?;
        self.repo.set_head(&refname)?;

        Ok(())
    }

    fn write_file(&mut self, path: &str, content: &str) -> VcsResult<()> {
        let workdir = self.repo.workdir().ok_or(VcsError::BareRepository)?;
        let target = workdir.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, content)?;

        Ok(())
    }

    fn stage_file(&mut self, path: &str) -> VcsResult<()> {
        let mut index = self.repo.index()?;
        index.add_path(Path::new(path))?;
        index.write()?;

        Ok(())
    }

    fn commit(&mut self, message: &str, allow_noop: bool) -> VcsResult<CommitOutcome> {
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let parent = self.repo.head()?.peel_to_commit()?;

        if parent.tree_id() == tree_id {
            return if allow_noop {
                Ok(CommitOutcome::NothingToCommit)
            } else {
                Err(VcsError::NothingToCommit)
            };
        }

        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.signature()?;
        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )?;

        Ok(CommitOutcome::Committed {
            id: oid.to_string(),
        })
    }

    fn tag_exists(&self, name: &str) -> VcsResult<bool> {
        match self.repo.find_reference(&format!("refs/tags/{}", name)) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn create_tag(&mut self, name: &str, message: &str) -> VcsResult<()> {
        if self.tag_exists(name)? {
            return Err(VcsError::TagExists(name.to_string()));
        }

        let head = self.repo.head()?.peel_to_commit()?;
        let signature = self.signature()?;
        self.repo
            .tag(name, head.as_object(), &signature, message, false)?;

        Ok(())
    }

    fn push(&mut self, branch: &str, tags: &[&str]) -> VcsResult<()> {
        let mut remote = self.find_remote()?;

        let mut refspecs = vec![format!("refs/heads/{0}:refs/heads/{0}", branch)];
        refspecs.extend(tags.iter().map(|tag| format!("refs/tags/{0}:refs/tags/{0}", tag)));

        let mut callbacks = remote_callbacks();
        callbacks.push_update_reference(|refname, status| match status {
            Some(status) => Err(git2::Error::from_str(&format!(
                "remote rejected {}: {}",
                refname, status
            ))),
            None => Ok(()),
        });

        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);

        remote.push(&refspecs, Some(&mut options)).map_err(|e| {
            if e.class() == git2::ErrorClass::Net {
                VcsError::remote(format!("Network error during push: {}", e))
            } else {
                VcsError::remote(format!("Failed to push '{}': {}", branch, e))
            }
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo_with_file(path: &str, content: &str) -> (TempDir, Git2Backend) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(&full, content).unwrap();

            let mut index = repo.index().unwrap();
            index.add_path(Path::new(path)).unwrap();
            index.write().unwrap();
            let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
            let sig = Signature::now("Test User", "test@example.com").unwrap();
            repo.commit(Some("refs/heads/main"), &sig, &sig, "init", &tree, &[])
                .unwrap();
            repo.set_head("refs/heads/main").unwrap();
        }
        (dir, Git2Backend::from_git2(repo, "origin"))
    }

    #[test]
    fn test_read_file_at_ref() {
        let (_dir, backend) = repo_with_file("app/package.json", r#"{"version":"2.0.0"}"#);

        let content = backend.read_file("main", "app/package.json").unwrap();
        assert_eq!(content.as_deref(), Some(r#"{"version":"2.0.0"}"#));
        assert_eq!(
            backend
                .read_file("refs/heads/main", "app/package.json")
                .unwrap()
                .as_deref(),
            Some(r#"{"version":"2.0.0"}"#)
        );
    }

    #[test]
    fn test_read_file_missing() {
        let (_dir, backend) = repo_with_file("package.json", "{}");

        assert_eq!(backend.read_file("main", "pyproject.toml").unwrap(), None);
        assert_eq!(backend.read_file("no-such-branch", "package.json").unwrap(), None);
        // a directory is not a manifest
        let (_dir, nested) = repo_with_file("app/package.json", "{}");
        assert_eq!(nested.read_file("main", "app").unwrap(), None);
    }

    #[test]
    fn test_list_files_walks_subtrees() {
        let (_dir, backend) = repo_with_file("web/app/package.json", "{}");

        assert_eq!(
            backend.list_files("main").unwrap(),
            vec!["web/app/package.json".to_string()]
        );
        assert!(backend.list_files("no-such-branch").unwrap().is_empty());
    }

    #[test]
    fn test_commit_noop_and_tag_guard() {
        let (_dir, mut backend) = repo_with_file("package.json", "{}");
        backend = backend.with_identity(Some(CommitterIdentity {
            name: "Release Bot".into(),
            email: "bot@example.com".into(),
        }));

        assert_eq!(
            backend.commit("nothing", true).unwrap(),
            CommitOutcome::NothingToCommit
        );
        assert!(matches!(
            backend.commit("nothing", false),
            Err(VcsError::NothingToCommit)
        ));

        backend.write_file("NOTES.md", "notes").unwrap();
        backend.stage_file("NOTES.md").unwrap();
        assert!(matches!(
            backend.commit("notes", true).unwrap(),
            CommitOutcome::Committed { .. }
        ));

        backend.create_tag("v1.0.0", "Release").unwrap();
        assert!(backend.tag_exists("v1.0.0").unwrap());
        assert!(matches!(
            backend.create_tag("v1.0.0", "Release"),
            Err(VcsError::TagExists(_))
        ));
    }

    #[test]
    fn test_missing_remote_is_reported() {
        let (_dir, mut backend) = repo_with_file("package.json", "{}");
        let err = backend.fetch_all().unwrap_err();
        assert!(err.to_string().contains("Remote 'origin' not found"));
    }
}
