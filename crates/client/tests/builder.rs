use std::sync::{Arc, Mutex};

use api_types::{
    DataSourceType,
    metadata::FieldMetadata,
    report::{ExportFormat, ExportRequest, QueryResult, ReportConfiguration},
    template::{ReportTemplate, TemplateNew},
};
use engine::{
    Completion, DiscardReason, EngineError, NoticeLevel, ReportAction, ReportFailure,
    RequestKind, fallback_fields,
};
use report_client::{ExportArtifact, ReportBackend, ReportBuilder};
use tokio::sync::Notify;

/// In-memory backend. Execution can be held until the test releases it.
#[derive(Default)]
struct FakeBackend {
    metadata_down: bool,
    hold_execute: Option<(Arc<Notify>, Arc<Notify>)>,
    templates: Mutex<Vec<ReportTemplate>>,
    executed: Mutex<Vec<ReportConfiguration>>,
}

impl FakeBackend {
    fn holding(started: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            hold_execute: Some((started, release)),
            ..Self::default()
        }
    }

    fn with_templates(templates: Vec<ReportTemplate>) -> Self {
        Self {
            templates: Mutex::new(templates),
            ..Self::default()
        }
    }
}

impl ReportBackend for FakeBackend {
    type Error = String;

    async fn fetch_fields(
        &self,
        data_source: DataSourceType,
    ) -> Result<Vec<FieldMetadata>, String> {
        if self.metadata_down {
            return Err("metadata service unavailable".to_string());
        }
        Ok(fallback_fields(data_source))
    }

    async fn execute(&self, config: &ReportConfiguration) -> Result<QueryResult, String> {
        if let Some((started, release)) = &self.hold_execute {
            started.notify_one();
            release.notified().await;
        }
        self.executed.lock().unwrap().push(config.clone());
        Ok(QueryResult {
            total_count: 5,
            execution_time: 3.0,
            ..QueryResult::default()
        })
    }

    async fn export(&self, request: &ExportRequest) -> Result<ExportArtifact, String> {
        Ok(ExportArtifact {
            format: request.format,
            file_name: format!("report.{}", request.format.extension()),
            content_type: request.format.content_type().to_string(),
            bytes: serde_json::to_vec(&request.config).map_err(|err| err.to_string())?,
        })
    }

    async fn list_templates(
        &self,
        report_type: Option<DataSourceType>,
    ) -> Result<Vec<ReportTemplate>, String> {
        let templates = self.templates.lock().unwrap();
        Ok(templates
            .iter()
            .filter(|t| report_type.is_none_or(|kind| t.report_type == kind))
            .cloned()
            .collect())
    }

    async fn save_template(&self, template: &TemplateNew) -> Result<ReportTemplate, String> {
        let mut templates = self.templates.lock().unwrap();
        let saved = ReportTemplate {
            id: format!("tpl-{}", templates.len() + 1),
            name: template.name.clone(),
            description: template.description.clone(),
            report_type: template.report_type,
            config: template.config.clone(),
            is_default: template.is_default,
        };
        templates.push(saved.clone());
        Ok(saved)
    }

    async fn load_template(&self, template_id: &str) -> Result<ReportTemplate, String> {
        self.templates
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == template_id)
            .cloned()
            .ok_or_else(|| format!("template {template_id} not found"))
    }

    async fn delete_template(&self, template_id: &str) -> Result<(), String> {
        let mut templates = self.templates.lock().unwrap();
        let before = templates.len();
        templates.retain(|t| t.id != template_id);
        if templates.len() == before {
            return Err(format!("template {template_id} not found"));
        }
        Ok(())
    }
}

async fn add_field<B: ReportBackend>(builder: &ReportBuilder<B>, name: &str) {
    let meta = builder
        .with_session(|s| s.catalog().require(name).cloned())
        .await
        .unwrap();
    builder.dispatch(ReportAction::AddField(meta)).await.unwrap();
}

#[tokio::test]
async fn open_loads_the_catalog() {
    let builder = ReportBuilder::open(FakeBackend::default(), DataSourceType::Debts)
        .await
        .unwrap();
    let (live, count) = builder
        .with_session(|s| (!s.catalog().is_degraded(), s.catalog().fields().len()))
        .await;
    assert!(live);
    assert_eq!(count, fallback_fields(DataSourceType::Debts).len());
}

#[tokio::test]
async fn metadata_outage_keeps_the_builder_usable() {
    let backend = FakeBackend {
        metadata_down: true,
        ..FakeBackend::default()
    };
    let builder = ReportBuilder::open(backend, DataSourceType::Transactions)
        .await
        .unwrap();

    assert!(builder.with_session(|s| s.catalog().is_degraded()).await);
    let notices = builder.drain_notices().await;
    assert_eq!(notices[0].level, NoticeLevel::Warning);

    add_field(&builder, "amount").await;
    assert!(builder.execute().await.unwrap().is_applied());
}

#[tokio::test]
async fn edits_proceed_while_execution_is_in_flight() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let builder = ReportBuilder::open(
        FakeBackend::holding(Arc::clone(&started), Arc::clone(&release)),
        DataSourceType::Transactions,
    )
    .await
    .unwrap();
    add_field(&builder, "amount").await;

    let running = tokio::spawn({
        let builder = builder.clone();
        async move { builder.execute().await }
    });
    started.notified().await;

    assert_eq!(
        builder.execute().await.unwrap_err(),
        EngineError::RequestInFlight(RequestKind::Execute)
    );
    add_field(&builder, "category").await;
    assert_eq!(builder.config().await.fields.len(), 2);

    release.notify_one();
    let completion = running.await.unwrap().unwrap();
    assert!(completion.is_applied());

    let preview_fields = builder
        .with_session(|s| s.preview().map(|p| p.config.fields.len()))
        .await;
    assert_eq!(preview_fields, Some(1));
}

#[tokio::test]
async fn switching_source_during_execution_discards_the_result() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let builder = ReportBuilder::open(
        FakeBackend::holding(Arc::clone(&started), Arc::clone(&release)),
        DataSourceType::Transactions,
    )
    .await
    .unwrap();
    add_field(&builder, "amount").await;

    let running = tokio::spawn({
        let builder = builder.clone();
        async move { builder.execute().await }
    });
    started.notified().await;

    let switched = builder
        .select_data_source(DataSourceType::Inventory)
        .await
        .unwrap();
    assert!(switched.is_applied());

    release.notify_one();
    let completion = running.await.unwrap().unwrap();
    assert_eq!(completion, Completion::Discarded(DiscardReason::Stale));
    assert!(builder.with_session(|s| s.preview().is_none()).await);
}

#[tokio::test]
async fn closing_discards_the_pending_result() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let builder = ReportBuilder::open(
        FakeBackend::holding(Arc::clone(&started), Arc::clone(&release)),
        DataSourceType::Salaries,
    )
    .await
    .unwrap();
    add_field(&builder, "net_salary").await;

    let running = tokio::spawn({
        let builder = builder.clone();
        async move { builder.execute().await }
    });
    started.notified().await;
    builder.close().await;
    release.notify_one();

    let completion = running.await.unwrap().unwrap();
    assert_eq!(completion, Completion::Discarded(DiscardReason::SessionClosed));
    assert_eq!(
        builder.dispatch(ReportAction::AddFilter).await,
        Err(EngineError::SessionClosed)
    );
}

#[tokio::test]
async fn export_delivers_the_artifact() {
    let builder = ReportBuilder::open(FakeBackend::default(), DataSourceType::Branches)
        .await
        .unwrap();
    add_field(&builder, "city").await;
    builder.execute().await.unwrap();

    let Completion::Applied(artifact) = builder.export(ExportFormat::Pdf).await.unwrap() else {
        panic!("export was not applied");
    };
    assert_eq!(artifact.file_name, "report.pdf");
    let exported: ReportConfiguration = serde_json::from_slice(&artifact.bytes).unwrap();
    assert_eq!(exported, builder.config().await);
}

#[tokio::test]
async fn template_round_trip_through_the_backend() {
    let builder = ReportBuilder::open(FakeBackend::default(), DataSourceType::Transactions)
        .await
        .unwrap();
    add_field(&builder, "amount").await;
    let saved_config = builder.config().await;

    let Completion::Applied(saved) = builder
        .save_template("Monthly  rent", None, true)
        .await
        .unwrap()
    else {
        panic!("save was not applied");
    };
    assert_eq!(saved.name, "Monthly rent");

    builder
        .select_data_source(DataSourceType::Debts)
        .await
        .unwrap();
    builder.refresh_templates(None).await.unwrap();
    assert_eq!(builder.with_session(|s| s.templates().len()).await, 1);

    assert!(builder.load_template(&saved.id).await.unwrap().is_applied());
    assert_eq!(builder.config().await, saved_config);
    assert!(!builder.with_session(|s| s.needs_metadata()).await);

    assert!(builder.delete_template(&saved.id).await.unwrap().is_applied());
    assert!(builder.with_session(|s| s.templates().is_empty()).await);
}

#[tokio::test]
async fn failed_template_load_is_reported() {
    let builder = ReportBuilder::open(
        FakeBackend::with_templates(Vec::new()),
        DataSourceType::Inventory,
    )
    .await
    .unwrap();

    let completion = builder.load_template("ghost").await.unwrap();
    assert!(matches!(
        completion,
        Completion::Failed(ReportFailure::Template(ref msg)) if msg.contains("ghost")
    ));
    assert_eq!(builder.config().await, ReportConfiguration::new(DataSourceType::Inventory));
}

#[tokio::test]
async fn default_export_uses_the_configured_format() {
    let builder = ReportBuilder::new(FakeBackend::default(), DataSourceType::Debts)
        .with_export_format(ExportFormat::Csv);
    builder.refresh_fields().await.unwrap();
    add_field(&builder, "debtor_name").await;

    let Completion::Applied(artifact) = builder.export_default().await.unwrap() else {
        panic!("export was not applied");
    };
    assert_eq!(artifact.format, ExportFormat::Csv);
    assert_eq!(artifact.file_name, "report.csv");
    assert_eq!(artifact.content_type, "text/csv");
}
