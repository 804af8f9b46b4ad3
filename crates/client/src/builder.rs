//! Async driver for a [`ReportSession`].
//!
//! Every operation locks the session to start a request, releases it while
//! the backend works and locks it again to hand the response back. Edits made
//! meanwhile are never blocked, and the session decides whether a late
//! response still applies.

use std::sync::Arc;

use api_types::{
    DataSourceType,
    report::{ExportFormat, ReportConfiguration},
    template::ReportTemplate,
};
use engine::{Completion, EngineError, Notice, ReportAction, ReportSession};
use tokio::sync::Mutex;

use crate::{
    backend::ReportBackend,
    client::{Client, ExportArtifact},
    config::ClientConfig,
};

pub type BuilderResult<T> = Result<T, EngineError>;

pub struct ReportBuilder<B> {
    backend: Arc<B>,
    session: Arc<Mutex<ReportSession>>,
    export_format: ExportFormat,
}

impl<B> Clone for ReportBuilder<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            session: Arc::clone(&self.session),
            export_format: self.export_format,
        }
    }
}

impl ReportBuilder<Client> {
    /// HTTP-backed builder using the configured endpoint, timeout and default
    /// export format. The catalog is not fetched yet.
    pub fn from_config(
        config: &ClientConfig,
        data_source: DataSourceType,
    ) -> crate::Result<Self> {
        let client = Client::from_config(config)?;
        Ok(Self::new(client, data_source).with_export_format(config.default_export_format))
    }
}

impl<B: ReportBackend> ReportBuilder<B> {
    pub fn new(backend: B, data_source: DataSourceType) -> Self {
        Self {
            backend: Arc::new(backend),
            session: Arc::new(Mutex::new(ReportSession::new(data_source))),
            export_format: ExportFormat::Excel,
        }
    }

    /// Format used by [`export_default`](Self::export_default).
    pub fn with_export_format(mut self, format: ExportFormat) -> Self {
        self.export_format = format;
        self
    }

    pub fn export_format(&self) -> ExportFormat {
        self.export_format
    }

    /// Create a builder and fetch the field catalog of `data_source`.
    pub async fn open(backend: B, data_source: DataSourceType) -> BuilderResult<Self> {
        let builder = Self::new(backend, data_source);
        builder.refresh_fields().await?;
        Ok(builder)
    }

    pub async fn dispatch(&self, action: ReportAction) -> BuilderResult<()> {
        self.session.lock().await.dispatch(action)
    }

    /// Switch data source and load its catalog.
    pub async fn select_data_source(
        &self,
        data_source: DataSourceType,
    ) -> BuilderResult<Completion> {
        self.dispatch(ReportAction::SetDataSource(data_source)).await?;
        self.refresh_fields().await
    }

    pub async fn refresh_fields(&self) -> BuilderResult<Completion> {
        let ticket = self.session.lock().await.begin_metadata()?;
        let result = self.backend.fetch_fields(ticket.data_source).await;
        Ok(self.session.lock().await.complete_metadata(ticket, result))
    }

    pub async fn execute(&self) -> BuilderResult<Completion> {
        let ticket = self.session.lock().await.begin_execute()?;
        let result = self.backend.execute(&ticket.config).await;
        Ok(self.session.lock().await.complete_execute(ticket, result))
    }

    pub async fn export(&self, format: ExportFormat) -> BuilderResult<Completion<ExportArtifact>> {
        let ticket = self.session.lock().await.begin_export(format)?;
        let result = self.backend.export(&ticket.request).await;
        Ok(self.session.lock().await.complete_export(ticket, result))
    }

    pub async fn export_default(&self) -> BuilderResult<Completion<ExportArtifact>> {
        self.export(self.export_format).await
    }

    pub async fn refresh_templates(
        &self,
        report_type: Option<DataSourceType>,
    ) -> BuilderResult<Completion> {
        let ticket = self
            .session
            .lock()
            .await
            .begin_list_templates(report_type)?;
        let result = self.backend.list_templates(ticket.report_type).await;
        Ok(self
            .session
            .lock()
            .await
            .complete_list_templates(ticket, result))
    }

    pub async fn save_template(
        &self,
        name: &str,
        description: Option<&str>,
        is_default: bool,
    ) -> BuilderResult<Completion<ReportTemplate>> {
        let ticket = self
            .session
            .lock()
            .await
            .begin_save_template(name, description, is_default)?;
        let result = self.backend.save_template(&ticket.request).await;
        Ok(self
            .session
            .lock()
            .await
            .complete_save_template(ticket, result))
    }

    /// Load a template and, when it targets another data source, that
    /// source's catalog.
    pub async fn load_template(&self, template_id: &str) -> BuilderResult<Completion> {
        let ticket = self.session.lock().await.begin_load_template(template_id)?;
        let result = self.backend.load_template(&ticket.template_id).await;
        let (completion, needs_metadata) = {
            let mut session = self.session.lock().await;
            let completion = session.complete_load_template(ticket, result);
            (completion, session.needs_metadata())
        };
        if completion.is_applied() && needs_metadata {
            self.refresh_fields().await?;
        }
        Ok(completion)
    }

    pub async fn delete_template(&self, template_id: &str) -> BuilderResult<Completion> {
        let ticket = self
            .session
            .lock()
            .await
            .begin_delete_template(template_id)?;
        let result = self.backend.delete_template(&ticket.template_id).await;
        Ok(self
            .session
            .lock()
            .await
            .complete_delete_template(ticket, result))
    }

    pub async fn close(&self) {
        self.session.lock().await.close();
    }

    pub async fn config(&self) -> ReportConfiguration {
        self.session.lock().await.config().clone()
    }

    pub async fn drain_notices(&self) -> Vec<Notice> {
        self.session.lock().await.drain_notices()
    }

    /// Run `f` against the session while holding its lock.
    pub async fn with_session<R>(&self, f: impl FnOnce(&ReportSession) -> R) -> R {
        f(&*self.session.lock().await)
    }
}
