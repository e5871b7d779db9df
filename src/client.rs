use reqwest::{header, Client};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tokio::time::sleep;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::errors::{BigPandaError, Result};
use crate::table;
use crate::types::{
    JobState, JobStatusResponse, MaintenancePlan, MaintenancePlanCreated,
    MaintenancePlansResponse, MappingEnrichmentsResponse, MappingSchema, MappingUploadResponse,
    NewMaintenancePlan, OimAlert,
};

/// Client for the BigPanda REST API
///
/// Covers maintenance plans, mapping enrichments (including the
/// asynchronous table upload job), and OIM alert submission. The bearer
/// token is fixed at construction; build one client per token.
///
/// # Example
///
/// ```rust,no_run
/// use bigpanda_api::{BigPandaClient, ClientConfig, OimAlert, OimAlertStatus};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = BigPandaClient::new(ClientConfig::new("ORG-TOKEN"))?;
///
///     let alert = OimAlert::new("my-app-key")
///         .with_status(OimAlertStatus::Warning)
///         .with_property("host", "web-1")
///         .with_property("check", "memory")
///         .with_property("description", "Memory usage is above 90%");
///
///     client.oim_send_alert(&alert).await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct BigPandaClient {
    client: ClientWithMiddleware,
    config: ClientConfig,
}

impl BigPandaClient {
    /// Create a new BigPanda client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(BigPandaError::BuildHttpClient)?;

        let client = ClientBuilder::new(client).build();

        Ok(Self { client, config })
    }

    /// Create a new client with a custom reqwest middleware client
    ///
    /// This allows you to add custom middleware (retry, logging, etc.)
    pub fn with_client(client: ClientWithMiddleware, config: ClientConfig) -> Self {
        Self { client, config }
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send an alert to a BigPanda OIM integration
    ///
    /// The client's bearer token must be the org token of the
    /// organization that owns the OIM integration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The HTTP request fails
    /// - BigPanda returns a non-success status code
    #[instrument(
        name = "BigPandaClient::oim_send_alert",
        skip_all,
        fields(app_key = %alert.app_key, status = %alert.status)
    )]
    pub async fn oim_send_alert(&self, alert: &OimAlert) -> Result<()> {
        let url = self.config.oim_url.join("alerts").expect("Valid URL path");

        debug!(url = %url, "Sending OIM alert");

        self.send("sending OIM alert", self.client.post(url).json(alert))
            .await?;

        debug!("OIM alert sent");
        Ok(())
    }

    /// Create a maintenance plan and return its server-assigned id
    ///
    /// # Errors
    ///
    /// Returns a validation error if the plan's end is not specified as
    /// exactly one of an absolute time or a duration, before any request
    /// is made. Otherwise errors mirror the HTTP outcome.
    #[instrument(name = "BigPandaClient::maintenance_plan_create", skip_all)]
    pub async fn maintenance_plan_create(&self, plan: NewMaintenancePlan) -> Result<String> {
        let body = plan.into_body()?;
        let url = self.resources_url("v2.0/maintenance-plans");

        debug!(url = %url, name = %body.name, "Creating maintenance plan");

        let created: MaintenancePlanCreated = self
            .send_json(
                "creating maintenance plan",
                self.client.post(url).json(&body),
            )
            .await?;

        debug!(plan_id = %created.id, "Maintenance plan created");
        Ok(created.id)
    }

    /// List all maintenance plans
    #[instrument(name = "BigPandaClient::maintenance_plans", skip_all)]
    pub async fn maintenance_plans(&self) -> Result<Vec<MaintenancePlan>> {
        let url = self.resources_url("v2.0/maintenance-plans");

        let response: MaintenancePlansResponse = self
            .send_json("listing maintenance plans", self.client.get(url))
            .await?;

        Ok(response.data)
    }

    /// Delete a maintenance plan
    #[instrument(
        name = "BigPandaClient::maintenance_plan_delete",
        skip_all,
        fields(plan_id)
    )]
    pub async fn maintenance_plan_delete(&self, plan_id: &str) -> Result<()> {
        let url = self.resources_url(&format!("v2.0/maintenance-plans/{plan_id}"));

        self.send("deleting maintenance plan", self.client.delete(url))
            .await?;

        debug!(plan_id, "Maintenance plan deleted");
        Ok(())
    }

    /// Stop a running maintenance plan
    ///
    /// Stopping schedules an immediate end for an active plan; plans
    /// that have not started yet should be deleted instead.
    #[instrument(
        name = "BigPandaClient::maintenance_plan_stop",
        skip_all,
        fields(plan_id)
    )]
    pub async fn maintenance_plan_stop(&self, plan_id: &str) -> Result<()> {
        let url = self.resources_url(&format!("v2.0/maintenance-plans/{plan_id}/stop"));

        self.send("stopping maintenance plan", self.client.post(url))
            .await?;

        debug!(plan_id, "Maintenance plan stopped");
        Ok(())
    }

    /// Create the schema for a new mapping enrichment
    ///
    /// The schema must exist before table data can be uploaded with
    /// [`mapping_update_table`](Self::mapping_update_table).
    #[instrument(
        name = "BigPandaClient::mapping_create_schema",
        skip_all,
        fields(name = %schema.name())
    )]
    pub async fn mapping_create_schema(&self, schema: &MappingSchema) -> Result<()> {
        let url = self.resources_url("v2.1/mapping-enrichment");

        debug!(url = %url, "Creating mapping enrichment schema");

        self.send(
            "creating mapping enrichment schema",
            self.client.post(url).json(schema),
        )
        .await?;

        debug!("Mapping enrichment schema created");
        Ok(())
    }

    /// Replace the contents of a mapping enrichment table
    ///
    /// Serializes the records to CSV (header = sorted union of the
    /// record fields), uploads them to the enrichment with the given
    /// name, and waits for the server-side job to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if no enrichment carries the given name, if the
    /// upload is not acknowledged with a job id, if the job reaches the
    /// `failed` status, or if any request fails. Without a configured
    /// poll cap this method waits for the job indefinitely; wrap it in
    /// [`tokio::time::timeout`] for a hard deadline.
    #[instrument(
        name = "BigPandaClient::mapping_update_table",
        skip_all,
        fields(enrichment = enrichment_name, records = records.len())
    )]
    pub async fn mapping_update_table(
        &self,
        records: &[HashMap<String, String>],
        enrichment_name: &str,
    ) -> Result<()> {
        let csv = table::records_to_csv(records)?;
        self.upload_mapping(&csv, enrichment_name).await
    }

    /// Replace the contents of a mapping enrichment table from a CSV document
    ///
    /// The enrichment name is taken from the second header column (the
    /// result tag); a header with fewer than two columns is a validation
    /// error reported before any request.
    #[instrument(name = "BigPandaClient::mapping_update_table_csv", skip_all)]
    pub async fn mapping_update_table_csv(&self, csv_text: &str) -> Result<()> {
        let enrichment_name = table::enrichment_name_from_csv(csv_text)?;
        self.upload_mapping(csv_text, &enrichment_name).await
    }

    async fn upload_mapping(&self, csv: &str, enrichment_name: &str) -> Result<()> {
        let mapping_id = self.lookup_mapping_id(enrichment_name).await?;
        debug!(enrichment = enrichment_name, mapping_id = %mapping_id, "Resolved mapping enrichment");

        let job_id = self.submit_mapping_data(&mapping_id, csv).await?;
        debug!(job_id = %job_id, "Mapping data submitted");

        self.wait_for_job(&job_id).await
    }

    /// Resolve an enrichment name to its internal id.
    ///
    /// Names are not guaranteed unique upstream; the first match wins.
    async fn lookup_mapping_id(&self, enrichment_name: &str) -> Result<String> {
        let url = self.resources_url("v2.1/mapping-enrichment");

        debug!(url = %url, "Getting mapping ID from BigPanda");

        let response: MappingEnrichmentsResponse = self
            .send_json("looking up mapping enrichment", self.client.get(url))
            .await?;

        response
            .data
            .into_iter()
            .find(|enrichment| enrichment.config.name == enrichment_name)
            .map(|enrichment| enrichment.id)
            .ok_or_else(|| BigPandaError::EnrichmentNotFound {
                name: enrichment_name.to_string(),
            })
    }

    async fn submit_mapping_data(&self, mapping_id: &str, csv: &str) -> Result<String> {
        let url = self.resources_url(&format!("v2.1/mapping-enrichment/{mapping_id}/map"));

        let response: MappingUploadResponse = self
            .send_json(
                "uploading mapping data",
                self.client
                    .post(url)
                    .header(header::CONTENT_TYPE, "text/csv; charset=utf8")
                    .body(csv.to_string()),
            )
            .await?;

        response.job_id.ok_or(BigPandaError::MissingJobId)
    }

    /// Poll the enrichment job until it reaches a terminal status.
    ///
    /// Sleeps for the configured interval before each poll, matching the
    /// cadence of the upload endpoint's processing.
    async fn wait_for_job(&self, job_id: &str) -> Result<()> {
        let url = self.resources_url(&format!("v2.1/alert-enrichments-jobs/{job_id}"));
        let mut attempts: u32 = 0;

        loop {
            debug!(job_id, "Waiting for upload to process");
            sleep(self.config.poll_interval).await;
            attempts += 1;

            let response: JobStatusResponse = self
                .send_json("polling enrichment job", self.client.get(url.clone()))
                .await?;

            match response.status {
                JobState::Done => {
                    debug!(job_id, "Upload complete");
                    return Ok(());
                }
                JobState::Failed => {
                    return Err(BigPandaError::JobFailed {
                        job_id: job_id.to_string(),
                    })
                }
                JobState::InProgress(status) => {
                    debug!(job_id, status = %status, attempts, "Upload still processing");
                    if let Some(max) = self.config.max_poll_attempts {
                        if attempts >= max {
                            return Err(BigPandaError::JobTimeout {
                                job_id: job_id.to_string(),
                                attempts,
                            });
                        }
                    }
                }
            }
        }
    }

    fn resources_url(&self, path: &str) -> Url {
        self.config
            .resources_url
            .join(path)
            .expect("Valid URL path")
    }

    async fn send(
        &self,
        step: &'static str,
        request: RequestBuilder,
    ) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|source| BigPandaError::Request { step, source })?;

        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BigPandaError::Api {
                step,
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn send_json<T>(&self, step: &'static str, request: RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(step, request).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| BigPandaError::Decode { step, source })
    }
}
