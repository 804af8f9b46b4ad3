//! The remote side of a report builder.
//!
//! [`ReportBuilder`](crate::ReportBuilder) only talks to the backend through
//! [`ReportBackend`], so tests and other transports can stand in for the HTTP
//! [`Client`].

use std::future::Future;

use api_types::{
    DataSourceType,
    metadata::FieldMetadata,
    report::{ExportRequest, QueryResult, ReportConfiguration},
    template::{ReportTemplate, TemplateNew},
};

use crate::client::{Client, ClientError, ExportArtifact};

pub trait ReportBackend: Send + Sync + 'static {
    type Error: std::fmt::Display + Send;

    fn fetch_fields(
        &self,
        data_source: DataSourceType,
    ) -> impl Future<Output = Result<Vec<FieldMetadata>, Self::Error>> + Send;

    fn execute(
        &self,
        config: &ReportConfiguration,
    ) -> impl Future<Output = Result<QueryResult, Self::Error>> + Send;

    fn export(
        &self,
        request: &ExportRequest,
    ) -> impl Future<Output = Result<ExportArtifact, Self::Error>> + Send;

    fn list_templates(
        &self,
        report_type: Option<DataSourceType>,
    ) -> impl Future<Output = Result<Vec<ReportTemplate>, Self::Error>> + Send;

    fn save_template(
        &self,
        template: &TemplateNew,
    ) -> impl Future<Output = Result<ReportTemplate, Self::Error>> + Send;

    fn load_template(
        &self,
        template_id: &str,
    ) -> impl Future<Output = Result<ReportTemplate, Self::Error>> + Send;

    fn delete_template(
        &self,
        template_id: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

impl ReportBackend for Client {
    type Error = ClientError;

    fn fetch_fields(
        &self,
        data_source: DataSourceType,
    ) -> impl Future<Output = Result<Vec<FieldMetadata>, ClientError>> + Send {
        Client::fetch_fields(self, data_source)
    }

    fn execute(
        &self,
        config: &ReportConfiguration,
    ) -> impl Future<Output = Result<QueryResult, ClientError>> + Send {
        Client::execute(self, config)
    }

    fn export(
        &self,
        request: &ExportRequest,
    ) -> impl Future<Output = Result<ExportArtifact, ClientError>> + Send {
        Client::export(self, request)
    }

    fn list_templates(
        &self,
        report_type: Option<DataSourceType>,
    ) -> impl Future<Output = Result<Vec<ReportTemplate>, ClientError>> + Send {
        Client::list_templates(self, report_type)
    }

    fn save_template(
        &self,
        template: &TemplateNew,
    ) -> impl Future<Output = Result<ReportTemplate, ClientError>> + Send {
        Client::save_template(self, template)
    }

    fn load_template(
        &self,
        template_id: &str,
    ) -> impl Future<Output = Result<ReportTemplate, ClientError>> + Send {
        Client::load_template(self, template_id)
    }

    fn delete_template(
        &self,
        template_id: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send {
        Client::delete_template(self, template_id)
    }
}
