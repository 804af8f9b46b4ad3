//! One builder session: the active configuration plus everything that comes
//! back from remote calls.
//!
//! Remote calls are split in two. `begin_*` checks the request may start,
//! marks it pending and hands out a ticket carrying exactly what must be sent.
//! `complete_*` takes the ticket back with the outcome and decides whether it
//! still applies. Responses are dropped when the session is closed, when a
//! newer request of the same kind took over, or when they belong to a data
//! source or configuration the user already left.
//!
//! Execute, export and each template operation allow one request in flight.
//! A metadata request may be started at any time and supersedes the previous
//! one.

use std::collections::HashMap;

use api_types::{
    DataSourceType,
    metadata::FieldMetadata,
    report::{ExportFormat, ExportRequest, QueryResult, ReportConfiguration},
    template::{ReportTemplate, TemplateNew},
};

use crate::{
    EngineError, FieldCatalog, ResultEngine,
    catalog::{CatalogStatus, FetchError, resolve_fields},
    error::ReportFailure,
    reducer::{ReportAction, reduce},
    util::normalize_template_name,
    validation::{can_execute, validate},
};

pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Metadata,
    Execute,
    Export,
    ListTemplates,
    SaveTemplate,
    LoadTemplate,
    DeleteTemplate,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Execute => "execute",
            Self::Export => "export",
            Self::ListTemplates => "template list",
            Self::SaveTemplate => "template save",
            Self::LoadTemplate => "template load",
            Self::DeleteTemplate => "template delete",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable state of the latest request of one kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestState {
    #[default]
    Idle,
    Pending(RequestId),
    Succeeded,
    Failed(ReportFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    SessionClosed,
    /// The user moved to another data source or configuration meanwhile.
    Stale,
    /// A newer request of the same kind was started.
    Superseded,
}

/// What happened to a response handed back to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<T = ()> {
    Applied(T),
    Failed(ReportFailure),
    Discarded(DiscardReason),
}

impl<T> Completion<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message for the user, drained by the host UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// The displayed result and the configuration that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub result: QueryResult,
    pub config: ReportConfiguration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataTicket {
    pub id: RequestId,
    pub data_source: DataSourceType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteTicket {
    pub id: RequestId,
    pub config: ReportConfiguration,
    epoch: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportTicket {
    pub id: RequestId,
    pub request: ExportRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateListTicket {
    pub id: RequestId,
    pub report_type: Option<DataSourceType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSaveTicket {
    pub id: RequestId,
    pub request: TemplateNew,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateTicket {
    pub id: RequestId,
    pub template_id: String,
}

#[derive(Debug)]
pub struct ReportSession {
    config: ReportConfiguration,
    catalog: FieldCatalog,
    preview: Option<Preview>,
    templates: Vec<ReportTemplate>,
    requests: HashMap<RequestKind, RequestState>,
    next_request: RequestId,
    /// Bumped whenever the displayed result stops matching the configuration
    /// lineage: data source switches and template loads.
    epoch: u64,
    open: bool,
    notices: Vec<Notice>,
}

impl ReportSession {
    pub fn new(data_source: DataSourceType) -> Self {
        Self {
            config: ReportConfiguration::new(data_source),
            catalog: FieldCatalog::loading(data_source),
            preview: None,
            templates: Vec::new(),
            requests: HashMap::new(),
            next_request: 0,
            epoch: 0,
            open: true,
            notices: Vec::new(),
        }
    }

    pub fn config(&self) -> &ReportConfiguration {
        &self.config
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn templates(&self) -> &[ReportTemplate] {
        &self.templates
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn request_state(&self, kind: RequestKind) -> RequestState {
        self.requests.get(&kind).cloned().unwrap_or_default()
    }

    pub fn is_pending(&self, kind: RequestKind) -> bool {
        matches!(self.requests.get(&kind), Some(RequestState::Pending(_)))
    }

    /// True when the execute trigger should be enabled.
    pub fn can_execute(&self) -> bool {
        self.open && !self.is_pending(RequestKind::Execute) && can_execute(&self.config)
    }

    /// True when the catalog does not describe the current data source yet.
    pub fn needs_metadata(&self) -> bool {
        self.catalog.data_source() != self.config.kind()
            || self.catalog.status() == &CatalogStatus::Loading
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Tear the session down. Every response arriving later is discarded.
    pub fn close(&mut self) {
        if self.open {
            tracing::debug!("report session closed");
        }
        self.open = false;
    }

    /// Apply one builder transition to the active configuration.
    pub fn dispatch(&mut self, action: ReportAction) -> ResultEngine<()> {
        self.ensure_open()?;
        let next = reduce(&self.config, &self.catalog, action)?;
        if next.kind() != self.config.kind() {
            tracing::info!("report data source {} -> {}", self.config.kind(), next.kind());
            self.catalog = FieldCatalog::loading(next.kind());
            self.preview = None;
            self.epoch += 1;
        }
        self.config = next;
        Ok(())
    }

    pub fn begin_metadata(&mut self) -> ResultEngine<MetadataTicket> {
        self.ensure_open()?;
        let id = self.start(RequestKind::Metadata);
        Ok(MetadataTicket {
            id,
            data_source: self.config.kind(),
        })
    }

    /// Apply a metadata response. A failure still installs a catalog (the
    /// built-in one) and reports a warning.
    pub fn complete_metadata<E: std::fmt::Display>(
        &mut self,
        ticket: MetadataTicket,
        result: Result<Vec<FieldMetadata>, E>,
    ) -> Completion {
        if let Some(reason) = self.discard_reason(RequestKind::Metadata, ticket.id) {
            return Completion::Discarded(reason);
        }
        if ticket.data_source != self.config.kind() {
            tracing::debug!(
                "discarding {} fields, current source is {}",
                ticket.data_source,
                self.config.kind()
            );
            self.finish(RequestKind::Metadata, RequestState::Idle);
            return Completion::Discarded(DiscardReason::Stale);
        }

        let result = result.map_err(|err| FetchError(err.to_string()));
        self.catalog = resolve_fields(result, ticket.data_source);
        match self.catalog.status().clone() {
            CatalogStatus::Degraded(reason) => {
                let failure = ReportFailure::MetadataFetch(reason);
                self.notify(NoticeLevel::Warning, failure.to_string());
                self.finish(RequestKind::Metadata, RequestState::Failed(failure));
            }
            _ => self.finish(RequestKind::Metadata, RequestState::Succeeded),
        }
        Completion::Applied(())
    }

    /// Validate the active configuration and snapshot it for sending.
    pub fn begin_execute(&mut self) -> ResultEngine<ExecuteTicket> {
        self.ensure_open()?;
        self.ensure_idle(RequestKind::Execute)?;
        let config = self.config.clone();
        self.ensure_valid(&config)?;
        let id = self.start(RequestKind::Execute);
        tracing::info!("executing {} report", config.kind());
        Ok(ExecuteTicket {
            id,
            config,
            epoch: self.epoch,
        })
    }

    /// A success replaces the preview wholesale; a failure keeps both the
    /// configuration and the previous preview.
    pub fn complete_execute<E: std::fmt::Display>(
        &mut self,
        ticket: ExecuteTicket,
        result: Result<QueryResult, E>,
    ) -> Completion {
        if let Some(reason) = self.discard_reason(RequestKind::Execute, ticket.id) {
            return Completion::Discarded(reason);
        }
        if ticket.epoch != self.epoch {
            self.finish(RequestKind::Execute, RequestState::Idle);
            return Completion::Discarded(DiscardReason::Stale);
        }

        match result {
            Ok(result) => {
                tracing::info!(
                    "report returned {} of {} rows in {}ms",
                    result.data.len(),
                    result.total_count,
                    result.execution_time
                );
                self.preview = Some(Preview {
                    result,
                    config: ticket.config,
                });
                self.finish(RequestKind::Execute, RequestState::Succeeded);
                Completion::Applied(())
            }
            Err(err) => self.fail(RequestKind::Execute, ReportFailure::Execution(err.to_string())),
        }
    }

    /// Export renders the configuration behind the displayed preview so the
    /// file matches what is on screen. Without a preview the active
    /// configuration is validated and used.
    pub fn begin_export(&mut self, format: ExportFormat) -> ResultEngine<ExportTicket> {
        self.ensure_open()?;
        self.ensure_idle(RequestKind::Export)?;
        let config = match &self.preview {
            Some(preview) => preview.config.clone(),
            None => {
                let config = self.config.clone();
                self.ensure_valid(&config)?;
                config
            }
        };
        let id = self.start(RequestKind::Export);
        Ok(ExportTicket {
            id,
            request: ExportRequest { config, format },
        })
    }

    /// The artifact is handed back to the caller, never stored.
    pub fn complete_export<A, E: std::fmt::Display>(
        &mut self,
        ticket: ExportTicket,
        result: Result<A, E>,
    ) -> Completion<A> {
        if let Some(reason) = self.discard_reason(RequestKind::Export, ticket.id) {
            return Completion::Discarded(reason);
        }
        match result {
            Ok(artifact) => {
                self.finish(RequestKind::Export, RequestState::Succeeded);
                self.notify(
                    NoticeLevel::Info,
                    format!("{} export ready", ticket.request.format.as_str()),
                );
                Completion::Applied(artifact)
            }
            Err(err) => self.fail(RequestKind::Export, ReportFailure::Export(err.to_string())),
        }
    }

    pub fn begin_list_templates(
        &mut self,
        report_type: Option<DataSourceType>,
    ) -> ResultEngine<TemplateListTicket> {
        self.ensure_open()?;
        self.ensure_idle(RequestKind::ListTemplates)?;
        let id = self.start(RequestKind::ListTemplates);
        Ok(TemplateListTicket { id, report_type })
    }

    pub fn complete_list_templates<E: std::fmt::Display>(
        &mut self,
        ticket: TemplateListTicket,
        result: Result<Vec<ReportTemplate>, E>,
    ) -> Completion {
        if let Some(reason) = self.discard_reason(RequestKind::ListTemplates, ticket.id) {
            return Completion::Discarded(reason);
        }
        match result {
            Ok(templates) => {
                self.templates = templates;
                self.finish(RequestKind::ListTemplates, RequestState::Succeeded);
                Completion::Applied(())
            }
            Err(err) => self.fail(
                RequestKind::ListTemplates,
                ReportFailure::Template(err.to_string()),
            ),
        }
    }

    /// Snapshot the active configuration under `name`.
    pub fn begin_save_template(
        &mut self,
        name: &str,
        description: Option<&str>,
        is_default: bool,
    ) -> ResultEngine<TemplateSaveTicket> {
        self.ensure_open()?;
        self.ensure_idle(RequestKind::SaveTemplate)?;
        let name = normalize_template_name(name)?;
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let id = self.start(RequestKind::SaveTemplate);
        Ok(TemplateSaveTicket {
            id,
            request: TemplateNew {
                name,
                description,
                report_type: self.config.kind(),
                config: self.config.clone(),
                is_default,
            },
        })
    }

    /// Record the saved template once the backend confirmed it.
    pub fn complete_save_template<E: std::fmt::Display>(
        &mut self,
        ticket: TemplateSaveTicket,
        result: Result<ReportTemplate, E>,
    ) -> Completion<ReportTemplate> {
        if let Some(reason) = self.discard_reason(RequestKind::SaveTemplate, ticket.id) {
            return Completion::Discarded(reason);
        }
        let saved = match result {
            Ok(saved) => saved,
            Err(err) => {
                return self.fail(
                    RequestKind::SaveTemplate,
                    ReportFailure::Template(err.to_string()),
                );
            }
        };

        if saved.is_default {
            for template in &mut self.templates {
                if template.report_type == saved.report_type {
                    template.is_default = false;
                }
            }
        }
        match self.templates.iter_mut().find(|t| t.id == saved.id) {
            Some(existing) => *existing = saved.clone(),
            None => self.templates.push(saved.clone()),
        }
        self.finish(RequestKind::SaveTemplate, RequestState::Succeeded);
        self.notify(NoticeLevel::Info, format!("template \"{}\" saved", saved.name));
        Completion::Applied(saved)
    }

    pub fn begin_load_template(&mut self, template_id: &str) -> ResultEngine<TemplateTicket> {
        self.ensure_open()?;
        self.ensure_idle(RequestKind::LoadTemplate)?;
        let id = self.start(RequestKind::LoadTemplate);
        Ok(TemplateTicket {
            id,
            template_id: template_id.to_string(),
        })
    }

    /// Replace the whole configuration with the template's and drop the
    /// preview. If the template targets another data source the catalog goes
    /// back to loading.
    pub fn complete_load_template<E: std::fmt::Display>(
        &mut self,
        ticket: TemplateTicket,
        result: Result<ReportTemplate, E>,
    ) -> Completion {
        if let Some(reason) = self.discard_reason(RequestKind::LoadTemplate, ticket.id) {
            return Completion::Discarded(reason);
        }
        let template = match result {
            Ok(template) => template,
            Err(err) => {
                return self.fail(
                    RequestKind::LoadTemplate,
                    ReportFailure::Template(err.to_string()),
                );
            }
        };

        let replacement = match reduce(
            &self.config,
            &self.catalog,
            ReportAction::Replace(template.config),
        ) {
            Ok(config) => config,
            Err(err) => {
                return self.fail(
                    RequestKind::LoadTemplate,
                    ReportFailure::Template(err.to_string()),
                );
            }
        };
        if replacement.kind() != self.catalog.data_source() {
            self.catalog = FieldCatalog::loading(replacement.kind());
        }
        self.config = replacement;
        self.preview = None;
        self.epoch += 1;
        self.finish(RequestKind::LoadTemplate, RequestState::Succeeded);
        tracing::info!("loaded template {} ({})", template.id, template.name);
        Completion::Applied(())
    }

    /// Start deleting a listed template. It stays listed until
    /// [`complete_delete_template`](Self::complete_delete_template) confirms.
    pub fn begin_delete_template(&mut self, template_id: &str) -> ResultEngine<TemplateTicket> {
        self.ensure_open()?;
        self.ensure_idle(RequestKind::DeleteTemplate)?;
        if !self.templates.iter().any(|t| t.id == template_id) {
            return Err(EngineError::KeyNotFound(template_id.to_string()));
        }
        let id = self.start(RequestKind::DeleteTemplate);
        Ok(TemplateTicket {
            id,
            template_id: template_id.to_string(),
        })
    }

    pub fn complete_delete_template<E: std::fmt::Display>(
        &mut self,
        ticket: TemplateTicket,
        result: Result<(), E>,
    ) -> Completion {
        if let Some(reason) = self.discard_reason(RequestKind::DeleteTemplate, ticket.id) {
            return Completion::Discarded(reason);
        }
        if let Err(err) = result {
            return self.fail(
                RequestKind::DeleteTemplate,
                ReportFailure::Template(err.to_string()),
            );
        }
        self.templates.retain(|t| t.id != ticket.template_id);
        self.finish(RequestKind::DeleteTemplate, RequestState::Succeeded);
        Completion::Applied(())
    }

    fn ensure_open(&self) -> ResultEngine<()> {
        if !self.open {
            return Err(EngineError::SessionClosed);
        }
        Ok(())
    }

    fn ensure_idle(&self, kind: RequestKind) -> ResultEngine<()> {
        if self.is_pending(kind) {
            return Err(EngineError::RequestInFlight(kind));
        }
        Ok(())
    }

    fn ensure_valid(&mut self, config: &ReportConfiguration) -> ResultEngine<()> {
        let issues = validate(config, &self.catalog);
        if issues.is_empty() {
            return Ok(());
        }
        let err = EngineError::Validation(issues);
        self.notify(NoticeLevel::Error, ReportFailure::from(&err).to_string());
        Err(err)
    }

    fn start(&mut self, kind: RequestKind) -> RequestId {
        self.next_request += 1;
        let id = self.next_request;
        self.requests.insert(kind, RequestState::Pending(id));
        id
    }

    fn finish(&mut self, kind: RequestKind, state: RequestState) {
        self.requests.insert(kind, state);
    }

    fn discard_reason(&self, kind: RequestKind, id: RequestId) -> Option<DiscardReason> {
        if !self.open {
            tracing::debug!("discarding {kind} response after close");
            return Some(DiscardReason::SessionClosed);
        }
        if self.requests.get(&kind) != Some(&RequestState::Pending(id)) {
            tracing::debug!("discarding superseded {kind} response");
            return Some(DiscardReason::Superseded);
        }
        None
    }

    fn fail<T>(&mut self, kind: RequestKind, failure: ReportFailure) -> Completion<T> {
        tracing::error!("{kind} request failed: {failure}");
        self.notify(NoticeLevel::Error, failure.to_string());
        self.finish(kind, RequestState::Failed(failure.clone()));
        Completion::Failed(failure)
    }

    fn notify(&mut self, level: NoticeLevel, message: String) {
        self.notices.push(Notice { level, message });
    }
}
