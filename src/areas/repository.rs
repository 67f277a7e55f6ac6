//! Repository context
//!
//! Every operation runs against an explicit [`Repository`] value that owns the
//! durable areas (object database, references, indexes, workspace) of one
//! working directory. Nothing is cached across instances.
//!
//! ## Layout
//!
//! ```text
//! <workdir>/.snow            the commondir itself, or a file holding its absolute path
//! <commondir>/config         JSON { "version", "uuid" }
//! <commondir>/HEAD           "ref: <branch>" or a commit hash
//! <commondir>/refs/<branch>  branch records
//! <commondir>/versions/      commits
//! <commondir>/objects/       blobs
//! <commondir>/indexes/       staging indexes
//! ```

use crate::areas::database::Database;
use crate::areas::index::{self, Index, MAIN_INDEX_ID};
use crate::areas::refs::Refs;
use crate::areas::workspace::Workspace;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::reference::{BranchRecord, Head, HeadInfo, Reference, ReferenceKind};
use crate::artifacts::branch::{HEAD_REF_NAME, resolve_alias};
use crate::artifacts::checkout::migration::{CheckoutOutcome, Migration};
use crate::artifacts::checkout::reset_flags::ResetFlags;
use crate::artifacts::commit::commit_writer::{CommitOptions, CommitWriter};
use crate::artifacts::core::locked_file;
use crate::artifacts::log::history::{CommitOrder, History};
use crate::artifacts::objects::commit::{Commit, UserData};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::ignore::IgnoreRules;
use crate::artifacts::status::inspector::Inspector;
use crate::artifacts::status::status_entry::{StatusEntry, StatusFilter};
use crate::artifacts::tree::tree_entry::TreeDir;
use crate::errors::{ErrorKind, SnowError, error_kind};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::cell::{RefCell, RefMut};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Name of the commondir marker in a working directory
pub const SNOW_MARKER: &str = ".snow";
/// Marker of a foreign version control system
pub const GIT_MARKER: &str = ".git";
pub const INITIAL_COMMIT_MESSAGE: &str = "Created Project";

const CONFIG_FILE: &str = "config";
const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub version: u32,
    pub uuid: Uuid,
}

impl RepositoryConfig {
    fn generate() -> Self {
        RepositoryConfig {
            version: CONFIG_VERSION,
            uuid: Uuid::new_v4(),
        }
    }

    fn load(commondir: &Path) -> anyhow::Result<Self> {
        let path = commondir.join(CONFIG_FILE);
        let content = match locked_file::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if error_kind(&e) == ErrorKind::NotFound => {
                return Err(
                    SnowError::not_found("repository config", path.display().to_string()).into(),
                );
            }
            Err(e) => return Err(e),
        };

        serde_json::from_str(&content)
            .with_context(|| format!("corrupt repository config {}", path.display()))
    }

    fn write(&self, commondir: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_vec_pretty(self)?;
        locked_file::write(&commondir.join(CONFIG_FILE), &content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RepoState {
    None,
    Git,
    Snow,
}

/// What lives at, or above, a directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoDetails {
    pub state: RepoState,
    pub workdir: Option<PathBuf>,
    pub commondir: Option<PathBuf>,
    pub uuid: Option<Uuid>,
}

impl RepoDetails {
    fn none() -> Self {
        RepoDetails {
            state: RepoState::None,
            workdir: None,
            commondir: None,
            uuid: None,
        }
    }
}

/// Classify `path` by walking upward until a marker is found
///
/// Subdirectories are never visited. In each directory `.snow` wins over `.git`.
pub fn get_repo_details(path: &Path) -> anyhow::Result<RepoDetails> {
    let path = path
        .canonicalize()
        .with_context(|| format!("Unable to resolve {}", path.display()))?;
    let start = if path.is_file() {
        path.parent().map(Path::to_path_buf).unwrap_or(path)
    } else {
        path
    };

    for directory in start.ancestors() {
        let marker = directory.join(SNOW_MARKER);

        let commondir = if marker.is_dir() {
            Some(marker)
        } else if marker.is_file() {
            let pointer = std::fs::read_to_string(&marker)
                .with_context(|| format!("Unable to read {}", marker.display()))?;
            Some(PathBuf::from(pointer.trim()))
        } else {
            None
        };

        if let Some(commondir) = commondir {
            return Ok(RepoDetails {
                state: RepoState::Snow,
                workdir: Some(directory.to_path_buf()),
                uuid: RepositoryConfig::load(&commondir).ok().map(|config| config.uuid),
                commondir: Some(commondir),
            });
        }

        if directory.join(GIT_MARKER).exists() {
            return Ok(RepoDetails {
                state: RepoState::Git,
                workdir: Some(directory.to_path_buf()),
                ..RepoDetails::none()
            });
        }
    }

    Ok(RepoDetails::none())
}

pub struct Repository {
    workdir: Box<Path>,
    commondir: Box<Path>,
    writer: RefCell<Box<dyn Write>>,
    config: RepositoryConfig,
    database: Database,
    workspace: Workspace,
    refs: Refs,
    ignore: IgnoreRules,
}

impl Repository {
    fn from_dirs(
        workdir: PathBuf,
        commondir: PathBuf,
        config: RepositoryConfig,
    ) -> anyhow::Result<Self> {
        let ignore = IgnoreRules::load(&workdir)?;

        Ok(Repository {
            database: Database::new(commondir.clone().into_boxed_path()),
            workspace: Workspace::new(workdir.clone().into_boxed_path()),
            refs: Refs::new(commondir.clone().into_boxed_path()),
            workdir: workdir.into_boxed_path(),
            commondir: commondir.into_boxed_path(),
            writer: RefCell::new(Box::new(std::io::stdout())),
            config,
            ignore,
        })
    }

    /// Create a repository in `workdir`, optionally keeping its data in an external `commondir`
    pub fn init_ext(workdir: &Path, commondir: Option<&Path>) -> anyhow::Result<Self> {
        std::fs::create_dir_all(workdir)
            .with_context(|| format!("Unable to create {}", workdir.display()))?;
        let workdir = workdir.canonicalize()?;

        let marker = workdir.join(SNOW_MARKER);
        if marker.exists() {
            return Err(SnowError::invalid_state(format!(
                "a snow repository already exists at {}",
                workdir.display()
            ))
            .into());
        }

        let commondir = match commondir {
            Some(commondir) => {
                std::fs::create_dir_all(commondir)
                    .with_context(|| format!("Unable to create {}", commondir.display()))?;
                let commondir = commondir.canonicalize()?;
                if commondir.join(CONFIG_FILE).exists() {
                    return Err(SnowError::invalid_state(format!(
                        "{} already holds a snow repository",
                        commondir.display()
                    ))
                    .into());
                }
                commondir
            }
            None => marker.clone(),
        };

        let config = RepositoryConfig::generate();
        let repository = Self::from_dirs(workdir, commondir, config)?;

        for directory in [
            repository.database.objects_path(),
            repository.database.versions_path(),
            repository.refs.refs_path(),
            index::indexes_path(&repository.commondir),
        ] {
            std::fs::create_dir_all(&directory)
                .with_context(|| format!("Unable to create {}", directory.display()))?;
        }
        repository.config.write(&repository.commondir)?;

        if repository.commondir.as_ref() != marker.as_path() {
            locked_file::write(
                &marker,
                repository.commondir.to_string_lossy().as_bytes(),
            )?;
        }

        let initial = Commit::new(
            None,
            TreeDir::root(),
            INITIAL_COMMIT_MESSAGE.to_string(),
            Vec::new(),
            UserData::new(),
        )?;
        repository.database.store_commit(&initial)?;

        let main = BranchName::default_branch();
        repository.refs.create_branch(
            &main,
            BranchRecord::new(initial.hash().clone(), UserData::new()),
        )?;
        repository.refs.set_head(&Head::Attached(main))?;

        tracing::info!(
            workdir = %repository.workdir.display(),
            commondir = %repository.commondir.display(),
            "repository initialized"
        );

        Ok(repository)
    }

    /// Open the repository `path` belongs to
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let details = get_repo_details(path)?;

        match details {
            RepoDetails {
                state: RepoState::Snow,
                workdir: Some(workdir),
                commondir: Some(commondir),
                ..
            } => {
                let config = RepositoryConfig::load(&commondir)?;
                tracing::debug!(workdir = %workdir.display(), "repository opened");
                Self::from_dirs(workdir, commondir, config)
            }
            _ => Err(SnowError::not_found("snow repository", path.display().to_string()).into()),
        }
    }

    pub fn with_writer(mut self, writer: Box<dyn Write>) -> Self {
        self.writer = RefCell::new(writer);
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn commondir(&self) -> &Path {
        &self.commondir
    }

    pub fn writer(&'_ self) -> RefMut<'_, Box<dyn Write>> {
        self.writer.borrow_mut()
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn ignore_rules(&self) -> &IgnoreRules {
        &self.ignore
    }

    pub fn head_commit(&self) -> anyhow::Result<Commit> {
        let (_, hash) = self.refs.resolve_head()?;
        self.database.load_commit(&hash)
    }

    /// The persisted main index, or a fresh one if nothing was staged yet
    pub fn ensure_main_index(&self) -> anyhow::Result<Index> {
        match Index::load(&self.commondir, MAIN_INDEX_ID) {
            Err(e) if error_kind(&e) == ErrorKind::NotFound => {
                Index::new(&self.commondir, MAIN_INDEX_ID)
            }
            loaded => loaded,
        }
    }

    pub fn create_index(&self) -> anyhow::Result<Index> {
        let id = loop {
            let id = Uuid::new_v4().simple().to_string();
            if !Index::exists(&self.commondir, &id) {
                break id;
            }
        };

        let index = Index::new(&self.commondir, &id)?;
        index.write_files()?;
        tracing::info!(index = %id, "index created");

        Ok(index)
    }

    pub fn get_index(&self, id: &str) -> anyhow::Result<Index> {
        Index::load(&self.commondir, id)
    }

    pub fn get_indexes(&self) -> anyhow::Result<Vec<String>> {
        Index::list_ids(&self.commondir)
    }

    pub async fn create_commit(
        &self,
        index: &mut Index,
        message: &str,
        options: CommitOptions,
        tags: Vec<String>,
        user_data: UserData,
    ) -> anyhow::Result<Commit> {
        CommitWriter::new(self)
            .write(index, message, options, tags, user_data)
            .await
    }

    pub fn get_all_commits(&self, order: CommitOrder) -> anyhow::Result<Vec<Commit>> {
        History::new(self).all_commits(order)
    }

    pub fn find_commit_by_hash(&self, hash: &str) -> anyhow::Result<Commit> {
        History::new(self).find_commit_by_hash(hash)
    }

    pub fn find_commit_by_reference_name(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> anyhow::Result<Commit> {
        History::new(self).find_commit_by_reference_name(kind, name)
    }

    /// Create a branch at `start_point`, or at HEAD's commit when absent
    pub fn create_new_reference(
        &self,
        kind: ReferenceKind,
        name: &str,
        start_point: Option<&str>,
        user_data: UserData,
    ) -> anyhow::Result<Reference> {
        if kind == ReferenceKind::Head {
            return Err(SnowError::invalid_state("HEAD always exists and cannot be created").into());
        }

        let name = BranchName::try_parse(name.to_string())?;
        let hash = match start_point {
            Some(start_point) => self.resolve_start_point(start_point)?,
            None => self.refs.resolve_head()?.1,
        };

        let record = BranchRecord::new(hash, user_data);
        self.refs.create_branch(&name, record.clone())?;

        Ok(Reference::from_record(&name, record))
    }

    fn resolve_start_point(&self, start_point: &str) -> anyhow::Result<ObjectId> {
        if resolve_alias(start_point) == HEAD_REF_NAME {
            return Ok(self.refs.resolve_head()?.1);
        }

        let branch = BranchName::try_parse(start_point.to_string())
            .ok()
            .filter(|branch| self.refs.branch_exists(branch));
        let commit = ObjectId::try_parse(start_point.to_string())
            .ok()
            .filter(|hash| self.database.has_commit(hash));

        match (branch, commit) {
            (Some(_), Some(_)) => Err(SnowError::invalid_state(format!(
                "start point '{start_point}' is both a branch and a commit"
            ))
            .into()),
            (Some(branch), None) => Ok(self.refs.read_branch(&branch)?.hash),
            (None, Some(hash)) => Ok(hash),
            (None, None) => Err(SnowError::not_found("commit or branch", start_point).into()),
        }
    }

    /// Delete a branch and return the commit it pointed to
    ///
    /// HEAD attached to the deleted branch is detached at that commit.
    pub fn delete_reference(&self, kind: ReferenceKind, name: &str) -> anyhow::Result<ObjectId> {
        if kind == ReferenceKind::Head {
            return Err(SnowError::invalid_state("HEAD cannot be deleted").into());
        }

        let branch = BranchName::try_parse(name.to_string())
            .ok()
            .filter(|branch| self.refs.branch_exists(branch))
            .ok_or_else(|| SnowError::invalid_state(format!("branch '{name}' does not exist")))?;

        if self.refs.read_head()?.branch() == Some(&branch) {
            let record = self.refs.read_branch(&branch)?;
            self.refs.set_head(&Head::Detached(record.hash))?;
        }

        Ok(self.refs.delete_branch(&branch)?.hash)
    }

    pub fn get_head(&self) -> anyhow::Result<HeadInfo> {
        let (head, hash) = self.refs.resolve_head()?;
        Ok(HeadInfo::new(&head, hash))
    }

    pub fn get_all_references(&self) -> anyhow::Result<Vec<Reference>> {
        Ok(self
            .refs
            .list_branches()?
            .into_iter()
            .map(|(name, record)| Reference::from_record(&name, record))
            .collect())
    }

    pub async fn checkout(&self, target: &str, flags: ResetFlags) -> anyhow::Result<CheckoutOutcome> {
        Migration::new(self, flags).run(target).await
    }

    pub async fn get_status(&self, filter: StatusFilter) -> anyhow::Result<Vec<StatusEntry>> {
        Inspector::new(self).status(filter).await
    }
}
