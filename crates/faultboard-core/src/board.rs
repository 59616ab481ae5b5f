//! Board session
//!
//! A [`Board`] follows two live queries on a [`DocumentStore`]:
//!
//! - the fault feed (every `common-fault` record), regrouped from scratch on
//!   each snapshot and colored through the session's
//!   [`ColorAssignmentStore`]
//! - the record feed (all categories, filtered by [`StatusFilter`], newest
//!   first) that record lists are built from
//!
//! Changing the status filter tears the old record feed down before the new
//! one is subscribed, so two feeds never write the same state.
//!
//! Link management reads titles and preconditions from the latest applied
//! snapshot and hands the write to the [`LinkMutator`].

use crate::config::{BoardConfig, StatusFilter};
use crate::error::BoardError;
use crate::filter::RecordFilter;
use faultboard_graph::{
    Category, Color, ColorAssignmentStore, FaultRecord, GroupEngine, Groups, LinkRef, Record,
    RecordId, Timestamp,
};
use faultboard_store::{
    DocumentStore, FieldUpdate, Fields, LinkMutator, LinkRequest, Query, Snapshot, Subscription,
    Transaction, UnlinkOutcome,
};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Grouping and colors at one fault-feed revision
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardView {
    /// Revision of the fault snapshot
    pub revision: u64,
    /// Current groups
    pub groups: Groups,
    /// Color of every current group
    pub colors: BTreeMap<RecordId, Color>,
}

impl BoardView {
    /// Group a fault snapshot and color the result
    ///
    /// New groups draw colors from `colors` oldest root first; groups seen
    /// before keep theirs.
    #[must_use]
    pub fn compute(
        revision: u64,
        faults: &[FaultRecord],
        engine: &GroupEngine,
        colors: &mut ColorAssignmentStore,
    ) -> Self {
        let groups = engine.compute(faults);
        let assigned = colors.assign_groups(&groups);
        if assigned > 0 {
            tracing::debug!(revision, assigned, total = colors.len(), "colored new groups");
        }
        Self::with_colors(revision, groups, colors)
    }

    fn with_colors(revision: u64, groups: Groups, colors: &ColorAssignmentStore) -> Self {
        let colors = groups
            .ids()
            .filter_map(|id| colors.color_of(id.as_str()).map(|c| (id.clone(), c.clone())))
            .collect();
        Self {
            revision,
            groups,
            colors,
        }
    }

    /// Group a record belongs to
    #[inline]
    #[must_use]
    pub fn group_id_of(&self, record_id: &str) -> Option<&RecordId> {
        self.groups.group_id_of(record_id)
    }

    /// Color of a group
    #[inline]
    #[must_use]
    pub fn color_of(&self, group_id: &str) -> Option<&Color> {
        self.colors.get(group_id)
    }

    /// Background color of a record, through its group
    #[must_use]
    pub fn record_color(&self, record_id: &str) -> Option<&Color> {
        self.group_id_of(record_id)
            .and_then(|group_id| self.color_of(group_id.as_str()))
    }

    /// Menu entries, newest group first
    #[must_use]
    pub fn summaries(&self) -> Vec<GroupSummary> {
        self.groups
            .menu_order()
            .into_iter()
            .map(|group| GroupSummary {
                group_id: group.group_id.clone(),
                title: group.title.clone(),
                color: self.color_of(group.group_id.as_str()).cloned(),
                created_at: group.created_at(),
                members: group.member_ids().cloned().collect(),
            })
            .collect()
    }
}

/// Serializable description of one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    /// Group id
    pub group_id: RecordId,
    /// Root title
    pub title: String,
    /// Assigned color
    pub color: Option<Color>,
    /// Root creation time
    pub created_at: Timestamp,
    /// Member ids, oldest first
    pub members: Vec<RecordId>,
}

/// Fields of a record to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    /// Category tag
    pub category: Category,
    /// Display title
    pub title: String,
    /// Author display name
    pub added_by: Option<String>,
    /// Appliance model number
    pub model_number: Option<String>,
    /// Appliance serial number
    pub serial_number: Option<String>,
    /// Service order number
    pub service_order_number: Option<String>,
    /// Salesforce case number
    pub salesforce_case_number: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Eight-digit question id, Q&A records only
    pub qa_id: Option<String>,
    /// Tracked on the manufacturer action tracker; ignored for Q&A
    pub on_samsung_tracker: bool,
}

impl NewRecord {
    /// Record with only category and title set
    #[must_use]
    pub fn new(category: Category, title: impl Into<String>) -> Self {
        Self {
            category,
            title: title.into(),
            added_by: None,
            model_number: None,
            serial_number: None,
            service_order_number: None,
            salesforce_case_number: None,
            description: None,
            qa_id: None,
            on_samsung_tracker: false,
        }
    }

    /// With author
    #[must_use]
    pub fn with_added_by(mut self, name: impl Into<String>) -> Self {
        self.added_by = Some(name.into());
        self
    }

    /// With model number
    #[must_use]
    pub fn with_model_number(mut self, model: impl Into<String>) -> Self {
        self.model_number = Some(model.into());
        self
    }

    /// With description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// With Q&A question id
    #[must_use]
    pub fn with_qa_id(mut self, qa_id: impl Into<String>) -> Self {
        self.qa_id = Some(qa_id.into());
        self
    }

    /// On the manufacturer action tracker
    #[must_use]
    pub fn on_samsung_tracker(mut self) -> Self {
        self.on_samsung_tracker = true;
        self
    }

    fn into_fields(self) -> Result<Fields, BoardError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(BoardError::InvalidRecord("title is required".to_string()));
        }
        if let Some(qa_id) = &self.qa_id {
            if self.category != Category::Qa {
                return Err(BoardError::InvalidRecord(
                    "only Q&A records carry a question id".to_string(),
                ));
            }
            if !is_question_id(qa_id) {
                return Err(BoardError::InvalidRecord(format!(
                    "question id must be eight digits: {qa_id}"
                )));
            }
        }

        let mut fields = Fields::new();
        fields.insert("category".into(), self.category.as_str().into());
        fields.insert("title".into(), title.into());
        fields.insert("isClosed".into(), false.into());
        fields.insert("comments".into(), Value::Array(Vec::new()));
        fields.insert("relatedTo".into(), Value::Array(Vec::new()));
        fields.insert("relatedBy".into(), Value::Array(Vec::new()));
        let optional = [
            ("addedBy", self.added_by),
            ("modelNumber", self.model_number),
            ("serialNumber", self.serial_number),
            ("serviceOrderNumber", self.service_order_number),
            ("salesforceCaseNumber", self.salesforce_case_number),
            ("description", self.description),
            ("qaId", self.qa_id),
        ];
        for (field, value) in optional {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                fields.insert(field.into(), value.into());
            }
        }
        if self.category != Category::Qa {
            fields.insert("onSamsungTracker".into(), self.on_samsung_tracker.into());
        }
        Ok(fields)
    }
}

/// Field changes to an existing record
///
/// `None` leaves a field untouched. A blank value clears an optional field;
/// a blank title is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordUpdate {
    /// New title
    pub title: Option<String>,
    /// Appliance model number
    pub model_number: Option<String>,
    /// Appliance serial number
    pub serial_number: Option<String>,
    /// Service order number
    pub service_order_number: Option<String>,
    /// Salesforce case number
    pub salesforce_case_number: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Eight-digit question id, Q&A records only
    pub qa_id: Option<String>,
    /// Manufacturer action tracker flag; not valid for Q&A
    pub on_samsung_tracker: Option<bool>,
}

impl RecordUpdate {
    /// Update that changes nothing
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set or clear the model number
    #[must_use]
    pub fn with_model_number(mut self, model: impl Into<String>) -> Self {
        self.model_number = Some(model.into());
        self
    }

    /// Set or clear the serial number
    #[must_use]
    pub fn with_serial_number(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    /// Set or clear the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set or clear the question id
    #[must_use]
    pub fn with_qa_id(mut self, qa_id: impl Into<String>) -> Self {
        self.qa_id = Some(qa_id.into());
        self
    }

    /// Set the action tracker flag
    #[must_use]
    pub fn with_samsung_tracker(mut self, on: bool) -> Self {
        self.on_samsung_tracker = Some(on);
        self
    }

    /// Whether the update writes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn into_updates(self, category: Category) -> Result<Vec<FieldUpdate>, BoardError> {
        let mut updates = Vec::new();
        if let Some(title) = self.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(BoardError::InvalidRecord("title is required".to_string()));
            }
            updates.push(FieldUpdate::set("title", title));
        }
        if let Some(qa_id) = self.qa_id.as_deref().map(str::trim) {
            if category != Category::Qa {
                return Err(BoardError::InvalidRecord(
                    "only Q&A records carry a question id".to_string(),
                ));
            }
            if !qa_id.is_empty() && !is_question_id(qa_id) {
                return Err(BoardError::InvalidRecord(format!(
                    "question id must be eight digits: {qa_id}"
                )));
            }
        }
        if let Some(on) = self.on_samsung_tracker {
            if category == Category::Qa {
                return Err(BoardError::InvalidRecord(
                    "Q&A records are not tracked".to_string(),
                ));
            }
            updates.push(FieldUpdate::set("onSamsungTracker", on));
        }

        let optional = [
            ("modelNumber", self.model_number),
            ("serialNumber", self.serial_number),
            ("serviceOrderNumber", self.service_order_number),
            ("salesforceCaseNumber", self.salesforce_case_number),
            ("description", self.description),
            ("qaId", self.qa_id),
        ];
        for (field, value) in optional {
            match value.as_deref().map(str::trim) {
                None => {}
                Some("") => updates.push(FieldUpdate::delete(field)),
                Some(value) => updates.push(FieldUpdate::set(field, value)),
            }
        }
        Ok(updates)
    }
}

fn is_question_id(qa_id: &str) -> bool {
    qa_id.len() == 8 && qa_id.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Default)]
struct BoardState {
    faults: Vec<FaultRecord>,
    view: BoardView,
    records: Vec<Record>,
    record_revision: u64,
    status_filter: StatusFilter,
}

impl BoardState {
    fn fault(&self, id: &str) -> Result<&FaultRecord, BoardError> {
        if let Some(fault) = self.faults.iter().find(|f| f.id().as_str() == id) {
            return Ok(fault);
        }
        if self.records.iter().any(|r| r.id().as_str() == id) {
            return Err(BoardError::NotAFault(RecordId::from(id)));
        }
        Err(BoardError::NotFound(RecordId::from(id)))
    }
}

/// State shared with the feed tasks
#[derive(Debug)]
struct Shared {
    engine: GroupEngine,
    state: RwLock<BoardState>,
    colors: Mutex<ColorAssignmentStore>,
    applied: watch::Sender<u64>,
    records_applied: watch::Sender<u64>,
}

impl Shared {
    fn apply_faults(&self, snapshot: &Snapshot) -> Result<(), BoardError> {
        let faults = snapshot.fault_records()?;

        // state before colors, everywhere
        let mut state = self.state.write();
        if snapshot.revision < state.view.revision {
            tracing::debug!(
                revision = snapshot.revision,
                current = state.view.revision,
                "skipping stale fault snapshot"
            );
            return Ok(());
        }
        let view = {
            let mut colors = self.colors.lock();
            BoardView::compute(snapshot.revision, &faults, &self.engine, &mut colors)
        };
        tracing::debug!(
            revision = snapshot.revision,
            faults = faults.len(),
            groups = view.groups.len(),
            "applied fault snapshot"
        );
        state.faults = faults;
        state.view = view;
        drop(state);

        self.applied.send_if_modified(|applied| {
            if snapshot.revision > *applied {
                *applied = snapshot.revision;
                true
            } else {
                false
            }
        });
        Ok(())
    }

    fn apply_records(&self, snapshot: &Snapshot, filter: StatusFilter) -> Result<(), BoardError> {
        let records = snapshot.records()?;
        let mut state = self.state.write();
        if state.status_filter != filter {
            return Ok(());
        }
        tracing::debug!(
            revision = snapshot.revision,
            records = records.len(),
            filter = filter.as_str(),
            "applied record snapshot"
        );
        state.records = records;
        state.record_revision = snapshot.revision;
        drop(state);

        self.records_applied.send_replace(snapshot.revision);
        Ok(())
    }
}

fn spawn_fault_feed(shared: Arc<Shared>, mut subscription: Subscription) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(snapshot) = subscription.next().await {
            if let Err(error) = shared.apply_faults(&snapshot) {
                tracing::error!(%error, revision = snapshot.revision, "dropping fault snapshot");
            }
        }
        tracing::debug!("fault feed closed");
    })
}

fn spawn_record_feed(
    shared: Arc<Shared>,
    mut subscription: Subscription,
    filter: StatusFilter,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(snapshot) = subscription.next().await {
            if let Err(error) = shared.apply_records(&snapshot, filter) {
                tracing::error!(%error, revision = snapshot.revision, "dropping record snapshot");
            }
        }
        tracing::debug!(filter = filter.as_str(), "record feed closed");
    })
}

async fn stop_feed(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        handle.abort();
        // resolves once the task, and its subscription, are dropped
        let _ = handle.await;
    }
}

/// One user's live view of the record board
#[derive(Debug)]
pub struct Board<S: ?Sized> {
    store: Arc<S>,
    mutator: LinkMutator<S>,
    config: BoardConfig,
    shared: Arc<Shared>,
    fault_feed: Mutex<Option<JoinHandle<()>>>,
    record_feed: Mutex<Option<JoinHandle<()>>>,
}

impl<S> Board<S>
where
    S: DocumentStore + ?Sized,
{
    /// Create a session; feeds start with [`Board::start`]
    ///
    /// # Errors
    /// Returns [`BoardError::Config`] if the configuration is invalid.
    pub fn new(store: Arc<S>, config: BoardConfig) -> Result<Self, BoardError> {
        config.validate()?;
        let colors = ColorAssignmentStore::new(config.palette()?);
        let (applied, _) = watch::channel(0);
        let (records_applied, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            engine: GroupEngine::new(),
            state: RwLock::new(BoardState {
                status_filter: config.status_filter,
                ..BoardState::default()
            }),
            colors: Mutex::new(colors),
            applied,
            records_applied,
        });
        Ok(Self {
            mutator: LinkMutator::new(Arc::clone(&store)),
            store,
            config,
            shared,
            fault_feed: Mutex::new(None),
            record_feed: Mutex::new(None),
        })
    }

    /// Session configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Start both feeds with the configured status filter
    pub async fn start(&self) {
        tracing::info!(
            app_id = %self.config.app_id,
            collection = %self.config.collection_path(),
            status = self.config.status_filter.as_str(),
            "starting board session"
        );
        self.watch_faults().await;
        self.set_status_filter(self.config.status_filter).await;
    }

    /// (Re)subscribe to the fault feed
    pub async fn watch_faults(&self) {
        let previous = self.fault_feed.lock().take();
        stop_feed(previous).await;

        let subscription = self.store.subscribe(Query::category(Category::CommonFault));
        let handle = spawn_fault_feed(Arc::clone(&self.shared), subscription);
        *self.fault_feed.lock() = Some(handle);
    }

    /// Switch the record feed to another status filter
    ///
    /// The previous feed is stopped before the new subscription is made.
    pub async fn set_status_filter(&self, filter: StatusFilter) {
        let previous = self.record_feed.lock().take();
        stop_feed(previous).await;

        {
            let mut state = self.shared.state.write();
            state.status_filter = filter;
            state.records.clear();
            state.record_revision = 0;
        }
        self.shared.records_applied.send_replace(0);
        let subscription = self.store.subscribe(filter.query());
        let handle = spawn_record_feed(Arc::clone(&self.shared), subscription, filter);
        *self.record_feed.lock() = Some(handle);
        tracing::info!(filter = filter.as_str(), "record feed switched");
    }

    /// Current status filter
    #[must_use]
    pub fn status_filter(&self) -> StatusFilter {
        self.shared.state.read().status_filter
    }

    /// Stop both feeds
    pub async fn stop(&self) {
        let faults = self.fault_feed.lock().take();
        let records = self.record_feed.lock().take();
        stop_feed(faults).await;
        stop_feed(records).await;
        tracing::info!("board session stopped");
    }

    /// Query the fault records once and apply the result
    ///
    /// # Errors
    /// Fails if the query fails or a fault document does not decode.
    pub async fn refresh(&self) -> Result<BoardView, BoardError> {
        let snapshot = self
            .store
            .query(&Query::category(Category::CommonFault))
            .await?;
        self.shared.apply_faults(&snapshot)?;
        Ok(self.view())
    }

    /// Wait until a fault snapshot at or after `revision` has been applied
    pub async fn wait_for_revision(&self, revision: u64) {
        let mut applied = self.shared.applied.subscribe();
        let _ = applied.wait_for(|current| *current >= revision).await;
    }

    /// Wait until the record feed has applied a snapshot at or after `revision`
    ///
    /// Only writes that change the feed's results produce a snapshot.
    pub async fn wait_for_records(&self, revision: u64) {
        let mut applied = self.shared.records_applied.subscribe();
        let _ = applied.wait_for(|current| *current >= revision).await;
    }

    /// Revision of the last applied record snapshot
    #[must_use]
    pub fn records_revision(&self) -> u64 {
        self.shared.state.read().record_revision
    }

    /// Revision of the last applied fault snapshot
    #[must_use]
    pub fn applied_revision(&self) -> u64 {
        *self.shared.applied.borrow()
    }

    /// Groups and colors of the last applied fault snapshot
    #[must_use]
    pub fn view(&self) -> BoardView {
        self.shared.state.read().view.clone()
    }

    /// Group of a record
    #[must_use]
    pub fn group_id_of(&self, record_id: &str) -> Option<RecordId> {
        self.shared.state.read().view.group_id_of(record_id).cloned()
    }

    /// Color assigned to a group at any point in this session
    #[must_use]
    pub fn color_of(&self, group_id: &str) -> Option<Color> {
        self.shared.colors.lock().color_of(group_id).cloned()
    }

    /// Members of a group, oldest first
    #[must_use]
    pub fn records_in_group(&self, group_id: &str) -> Vec<FaultRecord> {
        self.shared
            .state
            .read()
            .view
            .groups
            .get(group_id)
            .map(|g| g.members.clone())
            .unwrap_or_default()
    }

    /// Records in the status-filtered feed that pass `filter` and `search`
    #[must_use]
    pub fn visible_records(&self, filter: &RecordFilter, search: &str) -> Vec<Record> {
        let state = self.shared.state.read();
        filter.apply(&state.records, &state.view.groups, search)
    }

    /// Every link entry stored on a fault record
    ///
    /// # Errors
    /// Returns [`BoardError::NotFound`] or [`BoardError::NotAFault`].
    pub async fn linked_entries(&self, id: &str) -> Result<Vec<LinkRef>, BoardError> {
        let entries = {
            let state = self.shared.state.read();
            state
                .fault(id)
                .map(|fault| fault.linked_entries().cloned().collect::<Vec<_>>())
        };
        match entries {
            Ok(entries) => Ok(entries),
            Err(error) => Err(self.resolve_missing(error).await),
        }
    }

    /// Open fault records that `id` could be linked to, newest first
    ///
    /// # Errors
    /// Returns [`BoardError::NotFound`] or [`BoardError::NotAFault`].
    pub async fn link_candidates(&self, id: &str) -> Result<Vec<FaultRecord>, BoardError> {
        let candidates = {
            let state = self.shared.state.read();
            state.fault(id).map(|source| {
                state
                    .faults
                    .iter()
                    .filter(|f| f.id() != source.id())
                    .filter(|f| !f.is_closed())
                    .filter(|f| !source.is_linked_to(f.id()) && !f.is_linked_to(source.id()))
                    .cloned()
                    .collect::<Vec<_>>()
            })
        };
        match candidates {
            Ok(mut candidates) => {
                candidates.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
                Ok(candidates)
            }
            Err(error) => Err(self.resolve_missing(error).await),
        }
    }

    /// Tell a record outside both feeds apart from a missing one
    ///
    /// The record feed is status filtered, so a closed Q&A or general record
    /// is only visible to the store.
    async fn resolve_missing(&self, error: BoardError) -> BoardError {
        let BoardError::NotFound(id) = error else {
            return error;
        };
        match self.store.get(id.as_str()).await {
            Ok(Some(document))
                if document.get("category").and_then(Value::as_str)
                    != Some(Category::CommonFault.as_str()) =>
            {
                BoardError::NotAFault(id)
            }
            Ok(_) => BoardError::NotFound(id),
            Err(store) => store.into(),
        }
    }

    /// Link two fault records
    ///
    /// Both must be fault records in the current snapshot, the target must
    /// be open, distinct from the source and not yet linked to it. Titles
    /// are taken from the snapshot.
    ///
    /// # Errors
    /// A precondition error, or [`BoardError::Link`] if the write fails.
    pub async fn link(&self, source_id: &str, target_id: &str) -> Result<u64, BoardError> {
        let request = {
            let state = self.shared.state.read();
            state
                .fault(source_id)
                .and_then(|source| Ok((source, state.fault(target_id)?)))
                .and_then(|(source, target)| {
                    check_link(source, target)?;
                    Ok(LinkRequest::between(source, target))
                })
        };
        let request = match request {
            Ok(request) => request,
            Err(error) => {
                let error = self.resolve_missing(error).await;
                tracing::warn!(source = source_id, target = target_id, %error, "link rejected");
                return Err(error);
            }
        };
        let revision = self.mutator.link(&request).await?;
        tracing::info!(source = source_id, target = target_id, revision, "records linked");
        Ok(revision)
    }

    /// Remove every link between two records
    ///
    /// # Errors
    /// Returns [`BoardError::Link`] if either record is gone or the write
    /// fails.
    pub async fn unlink(&self, source_id: &str, target_id: &str) -> Result<UnlinkOutcome, BoardError> {
        let outcome = self
            .mutator
            .unlink(&RecordId::from(source_id), &RecordId::from(target_id))
            .await?;
        tracing::info!(
            source = source_id,
            target = target_id,
            removed = outcome.removed_entries,
            "records unlinked"
        );
        Ok(outcome)
    }

    /// Create a record; the store stamps its creation time
    ///
    /// # Errors
    /// Returns [`BoardError::InvalidRecord`] for a blank title or a bad
    /// question id, otherwise any store error.
    pub async fn add_record(&self, record: NewRecord) -> Result<RecordId, BoardError> {
        let category = record.category;
        let fields = record.into_fields()?;
        let stamp = FieldUpdate::ServerTimestamp {
            field: "createdAt".to_string(),
        };
        let id = self.store.create(fields, vec![stamp]).await?;
        tracing::info!(id = %id, category = category.as_str(), "record added");
        Ok(id)
    }

    /// Change the editable fields of a record
    ///
    /// Link entries on other records keep the title they were written
    /// with.
    ///
    /// # Errors
    /// Returns [`BoardError::NotFound`] for a missing record,
    /// [`BoardError::InvalidRecord`] for a blank title or a field the
    /// category does not carry, otherwise any store error.
    pub async fn update_record(&self, id: &str, update: RecordUpdate) -> Result<(), BoardError> {
        if update.is_empty() {
            return Ok(());
        }
        let document = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| BoardError::NotFound(RecordId::from(id)))?;
        let category = document.decode()?.category();
        let updates = update.into_updates(category)?;
        let fields = updates.len();
        self.store.update(id, updates).await?;
        tracing::info!(id, fields, "record edited");
        Ok(())
    }

    /// Rewrite when a record was created and by whom
    ///
    /// Moving a group member before its root re-roots the group: it gets a
    /// new id and a new color.
    ///
    /// # Errors
    /// Returns [`BoardError::InvalidRecord`] for a blank author, otherwise
    /// any store error.
    pub async fn set_created_at(
        &self,
        id: &str,
        created_at: Timestamp,
        added_by: &str,
    ) -> Result<(), BoardError> {
        let added_by = added_by.trim();
        if added_by.is_empty() {
            return Err(BoardError::InvalidRecord("author is required".to_string()));
        }
        let stamp = serde_json::json!({
            "seconds": created_at.seconds,
            "nanos": created_at.nanos,
        });
        self.store
            .update(
                id,
                vec![
                    FieldUpdate::set("createdAt", stamp),
                    FieldUpdate::set("addedBy", added_by),
                ],
            )
            .await?;
        tracing::info!(id, created_at = %created_at, added_by, "record time changed");
        Ok(())
    }

    /// Flip a record between open and closed, returning the new state
    ///
    /// # Errors
    /// Fails if the record is missing or changed during the update.
    pub async fn toggle_closed(&self, id: &str) -> Result<bool, BoardError> {
        let mut tx = Transaction::new();
        let document = tx.read(&*self.store, id).await?;
        let closed = !document
            .get("isClosed")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        tx.update(document.id.clone(), vec![FieldUpdate::set("isClosed", closed)]);
        self.store.commit(tx).await?;
        tracing::info!(id, closed, "record status changed");
        Ok(closed)
    }

    /// Delete a record; links pointing at it are left dangling
    ///
    /// # Errors
    /// Returns any store error.
    pub async fn delete_record(&self, id: &str) -> Result<(), BoardError> {
        self.store.delete(id).await?;
        tracing::info!(id, "record deleted");
        Ok(())
    }
}

impl<S: ?Sized> Drop for Board<S> {
    fn drop(&mut self) {
        for feed in [&self.fault_feed, &self.record_feed] {
            if let Some(handle) = feed.lock().take() {
                handle.abort();
            }
        }
    }
}

fn check_link(source: &FaultRecord, target: &FaultRecord) -> Result<(), BoardError> {
    if source.id() == target.id() {
        return Err(BoardError::SelfLink(source.id().clone()));
    }
    if target.is_closed() {
        return Err(BoardError::TargetClosed(target.id().clone()));
    }
    if source.is_linked_to(target.id()) || target.is_linked_to(source.id()) {
        return Err(BoardError::AlreadyLinked {
            source_id: source.id().clone(),
            target_id: target.id().clone(),
        });
    }
    Ok(())
}
