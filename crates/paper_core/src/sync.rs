//! crates/paper_core/src/sync.rs
//!
//! The synchronization coordinator. It owns the single current snapshot and
//! keeps three projections of it coherent: the page URL, local storage, and
//! the remote account store.
//!
//! State lives behind one mutex that is never held across an `.await`. Every
//! committed intent swaps the snapshot and rewrites the URL (and local
//! storage, when enabled) while holding that lock, so observers never see a
//! half-applied mutation. Remote saves of one document kind run one at a
//! time: each save takes a generation ticket, and a save whose ticket is no
//! longer the newest when its turn comes is skipped, so the store always ends
//! up holding the newest content.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use futures::lock::Mutex as AsyncMutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codec;
use crate::domain::{
    AccountDocument, BookmarkedCourse, Course, DocumentKind, DocumentSummary, Mode, Section,
    Switch,
};
use crate::error::{DecodeError, ModelError, SyncError};
use crate::ports::{
    AccountStore, Catalog, ExportFile, Exporter, LocalStorage, PortError, UrlStore,
};
use crate::schedule::{
    find_conflicts, group_locations, Conflict, LocationGroup, Removal, Schedule,
    ScheduleSelection,
};
use crate::snapshot::Snapshot;

/// Local-storage key holding the last committed snapshot.
pub const MOST_RECENT_PLAN_KEY: &str = "most_recent_plan";

//=========================================================================================
// Public Types
//=========================================================================================

/// Every mutation a user can make to the current snapshot.
#[derive(Debug, Clone)]
pub enum Intent {
    // --- Plan ---
    AddCourse {
        course: Course,
        year: usize,
        quarter: usize,
    },
    RemoveCourse {
        year: usize,
        quarter: usize,
        index: usize,
    },
    MoveCourse {
        from: (usize, usize),
        index: usize,
        to: (usize, usize),
    },
    AddSummer {
        year: usize,
    },
    RemoveSummer {
        year: usize,
    },
    ClearYear {
        year: usize,
    },
    AddYear,
    RemoveYear,
    ToggleBookmark {
        course_id: String,
    },
    ClearPlan,

    // --- Schedule ---
    AddSection(Section),
    RemoveSection {
        section_id: String,
        removal: Removal,
    },
    ToggleScheduleBookmark(BookmarkedCourse),
    SetTerm(Option<String>),
    ClearSchedule,

    // --- Options ---
    SetMode(Mode),
}

impl Intent {
    /// Removes a section if present; removing an absent one is a no-op.
    pub fn remove_section(section_id: impl Into<String>) -> Self {
        Intent::RemoveSection {
            section_id: section_id.into(),
            removal: Removal::Lenient,
        }
    }
}

/// Where `load` found the snapshot it installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Url,
    Storage,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub source: LoadSource,
    /// Set when an encoded snapshot was found but could not be decoded. The
    /// default snapshot was installed instead.
    pub notice: Option<DecodeError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// A newer save of the same document started before this one finished.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    Calendar,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Completed(ExportFile),
    /// An export of the same kind was already running.
    Ignored,
}

//=========================================================================================
// Internal State
//=========================================================================================

/// What the account store held the last time a document was loaded or saved.
#[derive(Debug, Clone)]
struct Synced {
    snapshot: Snapshot,
    notes: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    snapshot: Snapshot,
    /// Sections of `snapshot.schedule` the catalog resolved.
    schedule: Schedule,
    /// Section ids the catalog did not know. Kept so the URL never loses them.
    unresolved: Vec<String>,
    notes: HashMap<DocumentKind, Option<String>>,
    names: HashMap<DocumentKind, String>,
    synced: HashMap<DocumentKind, Synced>,
    generations: HashMap<DocumentKind, u64>,
}

impl State {
    fn bump_generation(&mut self, kind: DocumentKind) -> u64 {
        let generation = self.generations.entry(kind).or_insert(0);
        *generation += 1;
        *generation
    }

    fn generation(&self, kind: DocumentKind) -> u64 {
        self.generations.get(&kind).copied().unwrap_or(0)
    }

    fn forget_document(&mut self, kind: DocumentKind) {
        self.snapshot.options.set_active_id(kind, None);
        self.names.remove(&kind);
        self.synced.remove(&kind);
        self.notes.remove(&kind);
        // Any save still in flight for the old document must not land.
        self.bump_generation(kind);
    }
}

fn kind_for(mode: Mode) -> DocumentKind {
    match mode {
        Mode::Plan => DocumentKind::Plan,
        Mode::Schedule => DocumentKind::Schedule,
    }
}

/// The part of `snapshot` a saved document of `kind` holds.
fn scoped(kind: DocumentKind, snapshot: &Snapshot) -> Snapshot {
    match kind {
        DocumentKind::Plan => Snapshot::default().with_plan_from(snapshot),
        DocumentKind::Schedule => Snapshot::default().with_schedule_from(snapshot),
    }
}

fn take_content(kind: DocumentKind, base: &Snapshot, from: &Snapshot) -> Snapshot {
    match kind {
        DocumentKind::Plan => base.with_plan_from(from),
        DocumentKind::Schedule => base.with_schedule_from(from),
    }
}

/// Resolves a selection through the catalog. Ids the catalog does not know
/// are returned separately, in selection order.
fn hydrate(selection: &ScheduleSelection, catalog: &dyn Catalog) -> (Schedule, Vec<String>) {
    let mut schedule = Schedule::new();
    let mut unresolved = Vec::new();
    for id in &selection.section_ids {
        match catalog.section(id) {
            Some(section) if section.section_id == *id => {
                if let Ok(next) = schedule.add_section(section) {
                    schedule = next;
                }
            }
            _ => unresolved.push(id.clone()),
        }
    }
    (schedule, unresolved)
}

/// The persisted selection: resolved and unresolved ids together.
fn project(schedule: &Schedule, unresolved: &[String], term: Option<String>) -> ScheduleSelection {
    let mut selection = schedule.selection(term);
    selection.section_ids.extend(unresolved.iter().cloned());
    selection.section_ids.sort();
    selection.section_ids.dedup();
    selection
}

fn require_id(what: &str, id: &str) -> Result<(), ModelError> {
    if id.trim().is_empty() {
        return Err(ModelError::InvalidState(format!("{} id is empty", what)));
    }
    Ok(())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Removes `kind` from the in-flight set when dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<ExportKind>>,
    kind: ExportKind,
}

impl<'a> InFlight<'a> {
    fn acquire(set: &'a Mutex<HashSet<ExportKind>>, kind: ExportKind) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind);
        inserted.then_some(InFlight { set, kind })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.kind);
    }
}

//=========================================================================================
// Coordinator
//=========================================================================================

pub struct SyncCoordinator {
    url: Arc<dyn UrlStore>,
    storage: Arc<dyn LocalStorage>,
    accounts: Arc<dyn AccountStore>,
    catalog: Arc<dyn Catalog>,
    exporter: Arc<dyn Exporter>,
    state: Mutex<State>,
    exports: Mutex<HashSet<ExportKind>>,
    plan_saves: AsyncMutex<()>,
    schedule_saves: AsyncMutex<()>,
}

impl SyncCoordinator {
    pub fn new(
        url: Arc<dyn UrlStore>,
        storage: Arc<dyn LocalStorage>,
        accounts: Arc<dyn AccountStore>,
        catalog: Arc<dyn Catalog>,
        exporter: Arc<dyn Exporter>,
    ) -> Self {
        Self {
            url,
            storage,
            accounts,
            catalog,
            exporter,
            state: Mutex::new(State::default()),
            exports: Mutex::new(HashSet::new()),
            plan_saves: AsyncMutex::new(()),
            schedule_saves: AsyncMutex::new(()),
        }
    }

    fn save_lock(&self, kind: DocumentKind) -> &AsyncMutex<()> {
        match kind {
            DocumentKind::Plan => &self.plan_saves,
            DocumentKind::Schedule => &self.schedule_saves,
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes the committed snapshot to the URL and, when enabled, to local
    /// storage. Called with the state lock held.
    fn write_through(&self, snapshot: &Snapshot) {
        let encoded = codec::encode(snapshot);
        self.url.replace(&encoded);
        if snapshot.options.switches.get(Switch::SaveToStorage) {
            if let Err(e) = self.storage.set(MOST_RECENT_PLAN_KEY, &encoded) {
                warn!("Failed to write snapshot to local storage: {}", e);
            }
        }
    }

    fn install(&self, state: &mut State, snapshot: Snapshot) {
        let (schedule, unresolved) = hydrate(&snapshot.schedule, self.catalog.as_ref());
        if !unresolved.is_empty() {
            debug!("{} section id(s) not in the catalog", unresolved.len());
        }
        state.schedule = schedule;
        state.unresolved = unresolved;
        state.snapshot = snapshot;
    }

    // --- Loading ---

    /// Installs the initial snapshot. The URL wins when it carries content;
    /// otherwise the most recent snapshot from local storage is used when
    /// saving to storage is enabled. Nothing is written back.
    pub fn load(&self) -> LoadReport {
        let (mut snapshot, source, notice) = match self.find_initial() {
            Ok((snapshot, source)) => (snapshot, source, None),
            Err(e) => {
                warn!("Stored snapshot could not be decoded, starting empty: {}", e);
                (Snapshot::default(), LoadSource::Default, Some(e))
            }
        };

        for switch in Switch::ALL {
            if let Some(value) = self.storage.get(switch.key()).as_deref().and_then(parse_flag) {
                snapshot.options.switches = snapshot.options.switches.set(switch, value);
            }
        }

        let mut state = self.state();
        self.install(&mut state, snapshot);
        state.synced.clear();
        info!("Loaded snapshot from {:?}", source);
        LoadReport { source, notice }
    }

    fn find_initial(&self) -> Result<(Snapshot, LoadSource), DecodeError> {
        if let Some(encoded) = self.url.read().filter(|s| !s.trim().is_empty()) {
            let snapshot = codec::decode(&encoded)?;
            if !snapshot.is_empty() {
                return Ok((snapshot, LoadSource::Url));
            }
        }

        let save_to_storage = self
            .storage
            .get(Switch::SaveToStorage.key())
            .as_deref()
            .and_then(parse_flag)
            .unwrap_or(true);
        if save_to_storage {
            if let Some(encoded) = self.storage.get(MOST_RECENT_PLAN_KEY) {
                return Ok((codec::decode(&encoded)?, LoadSource::Storage));
            }
        }
        Ok((Snapshot::default(), LoadSource::Default))
    }

    // --- Reading ---

    pub fn snapshot(&self) -> Snapshot {
        self.state().snapshot.clone()
    }

    pub fn schedule(&self) -> Schedule {
        self.state().schedule.clone()
    }

    pub fn unresolved_sections(&self) -> Vec<String> {
        self.state().unresolved.clone()
    }

    pub fn conflicts(&self) -> Vec<Conflict> {
        find_conflicts(&self.state().schedule)
    }

    pub fn locations(&self) -> Vec<LocationGroup> {
        let schedule = self.schedule();
        group_locations(&schedule, self.catalog.as_ref())
    }

    /// Notes of the document behind the current mode.
    pub fn notes(&self) -> Option<String> {
        let state = self.state();
        let kind = kind_for(state.snapshot.options.mode);
        state.notes.get(&kind).cloned().flatten()
    }

    /// True when the active document of `kind` differs from what was last
    /// loaded from or saved to the account store.
    pub fn has_unsaved_changes(&self, kind: DocumentKind) -> bool {
        let state = self.state();
        match state.synced.get(&kind) {
            Some(synced) => {
                scoped(kind, &synced.snapshot) != scoped(kind, &state.snapshot)
                    || synced.notes != state.notes.get(&kind).cloned().flatten()
            }
            None => false,
        }
    }

    // --- Mutating ---

    /// Applies `intent` and commits the result. On error nothing changes.
    pub fn apply(&self, intent: Intent) -> Result<Snapshot, SyncError> {
        let mut state = self.state();
        let mut snapshot = state.snapshot.clone();
        let mut schedule = state.schedule.clone();
        let mut unresolved = state.unresolved.clone();

        match intent {
            Intent::AddCourse {
                course,
                year,
                quarter,
            } => snapshot.plan = snapshot.plan.add_course(&course, year, quarter)?,
            Intent::RemoveCourse {
                year,
                quarter,
                index,
            } => snapshot.plan = snapshot.plan.remove_course(year, quarter, index)?,
            Intent::MoveCourse { from, index, to } => {
                snapshot.plan = snapshot.plan.move_course(from, index, to)?
            }
            Intent::AddSummer { year } => snapshot.plan = snapshot.plan.add_summer_quarter(year)?,
            Intent::RemoveSummer { year } => {
                snapshot.plan = snapshot.plan.remove_summer_quarter(year)?
            }
            Intent::ClearYear { year } => snapshot.plan = snapshot.plan.clear_year(year)?,
            Intent::AddYear => snapshot.plan = snapshot.plan.add_year()?,
            Intent::RemoveYear => snapshot.plan = snapshot.plan.remove_year()?,
            Intent::ToggleBookmark { course_id } => {
                require_id("course", &course_id)?;
                snapshot.bookmarks = snapshot.bookmarks.toggle(&course_id)
            }
            Intent::ClearPlan => {
                snapshot.plan = snapshot.plan.clear();
                snapshot.bookmarks = snapshot.bookmarks.cleared();
            }
            Intent::AddSection(section) => {
                if unresolved.contains(&section.section_id) {
                    return Err(ModelError::Duplicate(format!(
                        "section {} is already in the schedule",
                        section.section_id
                    ))
                    .into());
                }
                schedule = schedule.add_section(section)?;
            }
            Intent::RemoveSection {
                section_id,
                removal,
            } => {
                let before = unresolved.len();
                unresolved.retain(|id| *id != section_id);
                let removal = if unresolved.len() < before {
                    Removal::Lenient
                } else {
                    removal
                };
                schedule = schedule.remove_section(&section_id, removal)?;
            }
            Intent::ToggleScheduleBookmark(course) => {
                require_id("course", &course.course_id)?;
                snapshot.schedule_bookmarks = snapshot.schedule_bookmarks.toggle(&course)
            }
            Intent::SetTerm(term) => snapshot.schedule.term = term,
            Intent::ClearSchedule => {
                schedule = schedule.clear();
                unresolved.clear();
                snapshot.schedule_bookmarks = snapshot.schedule_bookmarks.cleared();
            }
            Intent::SetMode(mode) => snapshot.options.mode = mode,
        }

        snapshot.schedule = project(&schedule, &unresolved, snapshot.schedule.term.clone());
        codec::check_fits(&snapshot)?;
        state.snapshot = snapshot;
        state.schedule = schedule;
        state.unresolved = unresolved;
        self.write_through(&state.snapshot);
        Ok(state.snapshot.clone())
    }

    /// Sets a switch. With `persist`, its own local-storage key is written too
    /// so the preference survives links that do not carry it.
    pub fn set_switch(&self, switch: Switch, value: bool, persist: bool) -> Snapshot {
        let mut state = self.state();
        state.snapshot.options.switches = state.snapshot.options.switches.set(switch, value);
        if persist {
            let flag = if value { "true" } else { "false" };
            if let Err(e) = self.storage.set(switch.key(), flag) {
                warn!("Failed to persist switch {}: {}", switch.key(), e);
            }
        }
        self.write_through(&state.snapshot);
        state.snapshot.clone()
    }

    /// Replaces the notes of the document behind the current mode.
    pub fn edit_notes(&self, text: &str) {
        let mut state = self.state();
        let kind = kind_for(state.snapshot.options.mode);
        let notes = (!text.is_empty()).then(|| text.to_string());
        state.notes.insert(kind, notes);
    }

    // --- Account documents ---

    pub async fn documents(&self, kind: DocumentKind) -> Result<Vec<DocumentSummary>, SyncError> {
        Ok(self.accounts.list(kind).await?)
    }

    pub async fn switch_plan(&self, id: Uuid) -> Result<Snapshot, SyncError> {
        self.switch_to(DocumentKind::Plan, id).await
    }

    pub async fn switch_schedule(&self, id: Uuid) -> Result<Snapshot, SyncError> {
        self.switch_to(DocumentKind::Schedule, id).await
    }

    /// Makes a saved document the active one. Its content replaces the
    /// matching part of the current snapshot; everything else is kept.
    async fn switch_to(&self, kind: DocumentKind, id: Uuid) -> Result<Snapshot, SyncError> {
        let document = self.accounts.load(kind, id).await?;
        let remote = codec::decode(&document.content)?;

        let mut state = self.state();
        let mut next = take_content(kind, &state.snapshot, &remote);
        next.options.set_active_id(kind, Some(id));
        codec::check_fits(&next)?;
        self.install(&mut state, next);
        // The loaded document now supersedes any save still running.
        state.bump_generation(kind);
        state.names.insert(kind, document.name.clone());
        state.notes.insert(kind, document.notes.clone());
        let synced = Synced {
            snapshot: state.snapshot.clone(),
            notes: document.notes,
        };
        state.synced.insert(kind, synced);
        self.write_through(&state.snapshot);
        info!("Switched to {} '{}'", kind, document.name);
        Ok(state.snapshot.clone())
    }

    /// Saves the document behind the current mode.
    pub async fn save(&self) -> Result<SaveOutcome, SyncError> {
        let kind = kind_for(self.state().snapshot.options.mode);
        self.save_document(kind).await
    }

    /// Writes the active document of `kind` to the account store.
    ///
    /// Saves of one kind never overlap at the store. Each save takes a
    /// generation ticket up front; when its turn comes, a save whose ticket
    /// has been overtaken returns `Superseded` without writing, and the newer
    /// save writes whatever content is current by then.
    pub async fn save_document(&self, kind: DocumentKind) -> Result<SaveOutcome, SyncError> {
        let (id, ticket) = {
            let mut state = self.state();
            let id = state
                .snapshot
                .options
                .active_id(kind)
                .ok_or(SyncError::NothingActive(kind))?;
            (id, state.bump_generation(kind))
        };

        let _turn = self.save_lock(kind).lock().await;

        let cached_name = {
            let state = self.state();
            if state.generation(kind) != ticket {
                debug!("Save of {} {} was superseded before it started", kind, id);
                return Ok(SaveOutcome::Superseded);
            }
            state.names.get(&kind).cloned()
        };
        let name = match cached_name {
            Some(name) => name,
            None => self
                .accounts
                .name(kind, id)
                .await?
                .ok_or_else(|| PortError::NotFound(format!("{} {}", kind, id)))?,
        };

        let (saved, document) = {
            let state = self.state();
            let active = state.snapshot.options.active_id(kind);
            if state.generation(kind) != ticket || active != Some(id) {
                return Ok(SaveOutcome::Superseded);
            }
            let saved = state.snapshot.clone();
            let document = AccountDocument {
                id,
                kind,
                name,
                content: codec::encode(&scoped(kind, &saved)),
                notes: state.notes.get(&kind).cloned().flatten(),
                updated_at: Utc::now(),
            };
            (saved, document)
        };

        if let Err(e) = self.accounts.save(&document).await {
            warn!("Saving {} {} failed: {}", kind, id, e);
            return Err(e.into());
        }

        let mut state = self.state();
        if state.generation(kind) != ticket {
            debug!("Save of {} {} was superseded", kind, id);
            return Ok(SaveOutcome::Superseded);
        }
        state.names.insert(kind, document.name);
        state.synced.insert(
            kind,
            Synced {
                snapshot: saved,
                notes: document.notes,
            },
        );
        info!("Saved {} {}", kind, id);
        Ok(SaveOutcome::Saved)
    }

    /// Creates a new document from the current content and makes it active.
    pub async fn save_as_new(
        &self,
        kind: DocumentKind,
        name: &str,
    ) -> Result<AccountDocument, SyncError> {
        let saved = self.snapshot();
        let content = codec::encode(&scoped(kind, &saved));
        let document = self.accounts.create(kind, name, &content).await?;

        let mut state = self.state();
        state.bump_generation(kind);
        state.snapshot.options.set_active_id(kind, Some(document.id));
        state.names.insert(kind, document.name.clone());
        state.synced.insert(
            kind,
            Synced {
                snapshot: saved,
                notes: document.notes.clone(),
            },
        );
        self.write_through(&state.snapshot);
        info!("Created {} '{}'", kind, document.name);
        Ok(document)
    }

    /// Deletes a saved document. Deleting the active one leaves the current
    /// content in place but detaches it from any document.
    pub async fn delete(&self, kind: DocumentKind, id: Uuid) -> Result<(), SyncError> {
        self.accounts.delete(kind, id).await?;
        let mut state = self.state();
        if state.snapshot.options.active_id(kind) == Some(id) {
            state.forget_document(kind);
            self.write_through(&state.snapshot);
        }
        Ok(())
    }

    /// Name of the document behind the current mode, for the toolbar.
    pub async fn active_name(&self) -> Result<Option<String>, SyncError> {
        let (kind, id) = {
            let state = self.state();
            let kind = kind_for(state.snapshot.options.mode);
            (kind, state.snapshot.options.active_id(kind))
        };
        let Some(id) = id else {
            return Ok(None);
        };
        let name = match kind {
            DocumentKind::Plan => self.accounts.plan_name(id).await?,
            DocumentKind::Schedule => self.accounts.schedule_name(id).await?,
        };
        Ok(name)
    }

    /// Reverts the document behind the current mode to its last synced state.
    pub fn discard_changes(&self) -> Result<Snapshot, SyncError> {
        let kind = kind_for(self.state().snapshot.options.mode);
        self.discard_document_changes(kind)
    }

    pub fn discard_document_changes(&self, kind: DocumentKind) -> Result<Snapshot, SyncError> {
        let mut state = self.state();
        let synced = state
            .synced
            .get(&kind)
            .cloned()
            .ok_or(SyncError::NothingActive(kind))?;
        let next = take_content(kind, &state.snapshot, &synced.snapshot);
        codec::check_fits(&next)?;
        self.install(&mut state, next);
        state.notes.insert(kind, synced.notes);
        self.write_through(&state.snapshot);
        Ok(state.snapshot.clone())
    }

    // --- Export ---

    /// Runs one export. A second request of the same kind while one is
    /// running is ignored.
    pub async fn export(&self, kind: ExportKind) -> Result<ExportOutcome, SyncError> {
        let Some(_in_flight) = InFlight::acquire(&self.exports, kind) else {
            debug!("{:?} export already running", kind);
            return Ok(ExportOutcome::Ignored);
        };

        let schedule = self.schedule();
        let file = match kind {
            ExportKind::Calendar => {
                let sections = schedule.exportable_sections();
                if sections.is_empty() {
                    return Err(ModelError::InvalidState(
                        "no scheduled section has dates and meeting times".to_string(),
                    )
                    .into());
                }
                self.exporter.export_calendar(&sections).await?
            }
            ExportKind::Image => self.exporter.export_image(&schedule).await?,
        };
        info!("Exported {}", file.file_name);
        Ok(ExportOutcome::Completed(file))
    }
}
