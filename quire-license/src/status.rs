//! Status reconciliation with the status authority.
//!
//! [`StatusReconciler`] owns the current status document of a license. It
//! answers usability queries from the cached document and performs the
//! remote lifecycle actions (renew, return), replacing the document with the
//! authority's answer. Remote actions are serialized; readers see either the
//! old or the new document, never a mix.

use crate::device::DeviceIdentity;
use crate::error::{LicenseError, LicenseResult};
use crate::network::{HttpClient, HttpRequest, HttpResponse};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use quire_types::{license_rel, status_rel, License, Link, Status, StatusDocument};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Opens web pages for the user, e.g. an HTML renewal page.
#[async_trait]
pub trait UrlPresenter: Send + Sync {
    /// Completes when the user is done with the page.
    async fn present(&self, url: &str);
}

/// Tracks the lifecycle status of one license.
pub struct StatusReconciler {
    http: Arc<dyn HttpClient>,
    document: RwLock<Option<StatusDocument>>,
    operation: Mutex<()>,
}

impl StatusReconciler {
    pub fn new(http: Arc<dyn HttpClient>, document: Option<StatusDocument>) -> Self {
        Self {
            http,
            document: RwLock::new(document),
            operation: Mutex::new(()),
        }
    }

    /// Current status document.
    pub fn document(&self) -> Option<StatusDocument> {
        self.document
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, document: StatusDocument) {
        info!("License {} is now {}", document.id, document.status);
        *self.document.write().unwrap_or_else(PoisonError::into_inner) = Some(document);
    }

    /// Current status; `None` when the license has no status document.
    pub fn status(&self) -> Option<Status> {
        self.document
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|d| d.status)
    }

    /// Licenses without a status document are usable.
    pub fn is_usable(&self) -> bool {
        self.status().is_none_or(|s| s.is_usable())
    }

    pub fn check_usable(&self) -> LicenseResult<()> {
        match self.status() {
            Some(status) if !status.is_usable() => Err(LicenseError::LicenseUnusable(status)),
            _ => Ok(()),
        }
    }

    /// Latest end date the authority accepts for a renewal.
    pub fn max_renew_date(&self) -> Option<DateTime<Utc>> {
        self.document
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(StatusDocument::potential_rights_end)
    }

    pub fn can_renew_loan(&self) -> bool {
        self.is_usable() && self.action_link(status_rel::RENEW).is_some()
    }

    pub fn can_return_publication(&self) -> bool {
        self.is_usable() && self.action_link(status_rel::RETURN).is_some()
    }

    /// Link of a remote action in the current document.
    pub fn action_link(&self, rel: &str) -> Option<Link> {
        self.document
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|d| d.link(rel).cloned())
    }

    /// Local preconditions of a renewal. Never touches the network.
    pub fn check_renew(&self, end: Option<DateTime<Utc>>) -> LicenseResult<Link> {
        let document = self.document();
        check_renew(document.as_ref(), end)
    }

    /// Local preconditions of a return. Never touches the network.
    pub fn check_return(&self) -> LicenseResult<Link> {
        let document = self.document();
        check_return(document.as_ref()).map(|(_, link)| link)
    }

    /// Extends the loan, optionally up to `end`.
    ///
    /// HTML renew links are handed to `presenter`; the status document is
    /// then fetched again from the license's status link.
    pub async fn renew_loan(
        &self,
        license: &License,
        device: &DeviceIdentity,
        end: Option<DateTime<Utc>>,
        presenter: &dyn UrlPresenter,
    ) -> LicenseResult<()> {
        let _guard = self.operation.lock().await;
        let current = self.document();
        let link = check_renew(current.as_ref(), end)?;

        let end_param = end.map(|e| e.to_rfc3339_opts(SecondsFormat::Secs, true));
        let mut params = device.query_params();
        if let Some(end) = end_param.as_deref() {
            params.push(("end", end));
        }
        let url = link.url(&params)?;

        let body = if link.is_html() {
            debug!("Presenting renewal page {}", url);
            presenter.present(&url).await;

            let status_link = license
                .link(license_rel::STATUS)
                .ok_or_else(|| LicenseError::MissingLink(license_rel::STATUS.to_string()))?;
            let response = self.http.fetch(HttpRequest::get(status_link.url(&[])?)).await?;
            if !response.is_success() {
                return Err(status_refresh_error(&response));
            }
            response.body
        } else {
            let response = self.http.fetch(HttpRequest::put(url).with_params(&params)).await?;
            match response.status {
                status if (200..300).contains(&status) => response.body,
                403 => {
                    return Err(LicenseError::RenewalDateOutOfRange {
                        requested: end,
                        max: current.as_ref().and_then(StatusDocument::potential_rights_end),
                    });
                }
                status if status >= 500 => {
                    return Err(LicenseError::Network(format!("renew failed with HTTP {status}")));
                }
                status => return Err(LicenseError::RenewFailed(format!("HTTP {status}"))),
            }
        };

        self.replace(StatusDocument::from_json(&body)?);
        Ok(())
    }

    /// Returns the publication early.
    pub async fn return_publication(&self, device: &DeviceIdentity) -> LicenseResult<()> {
        let _guard = self.operation.lock().await;
        let current = self.document();
        let (current, link) = check_return(current.as_ref())?;

        let params = device.query_params();
        let url = link.url(&params)?;
        let response = self.http.fetch(HttpRequest::post(url).with_params(&params)).await?;

        match response.status {
            // 409: already returned on the authority's side.
            status if (200..300).contains(&status) || status == 409 => {
                let document = match StatusDocument::from_json(&response.body) {
                    Ok(document) => document,
                    Err(e) => {
                        debug!("Keeping current status document: {}", e);
                        current.clone()
                    }
                };
                self.replace(document.with_status(Status::Returned));
                Ok(())
            }
            status if status >= 500 => Err(LicenseError::Network(format!(
                "return failed with HTTP {status}"
            ))),
            status => {
                warn!("Return of license {} rejected with HTTP {}", current.id, status);
                Err(LicenseError::ReturnFailed(format!("HTTP {status}")))
            }
        }
    }
}

fn check_renew(document: Option<&StatusDocument>, end: Option<DateTime<Utc>>) -> LicenseResult<Link> {
    let document =
        document.ok_or_else(|| LicenseError::MissingLink(status_rel::RENEW.to_string()))?;
    if !document.status.is_usable() {
        return Err(LicenseError::LicenseUnusable(document.status));
    }
    let max = document.potential_rights_end();
    if let (Some(requested), Some(max)) = (end, max) {
        if requested > max {
            return Err(LicenseError::RenewalDateOutOfRange {
                requested: Some(requested),
                max: Some(max),
            });
        }
    }
    document
        .link(status_rel::RENEW)
        .cloned()
        .ok_or_else(|| LicenseError::MissingLink(status_rel::RENEW.to_string()))
}

fn check_return(document: Option<&StatusDocument>) -> LicenseResult<(&StatusDocument, Link)> {
    let document =
        document.ok_or_else(|| LicenseError::MissingLink(status_rel::RETURN.to_string()))?;
    if !document.status.is_usable() {
        return Err(LicenseError::LicenseUnusable(document.status));
    }
    let link = document
        .link(status_rel::RETURN)
        .cloned()
        .ok_or_else(|| LicenseError::MissingLink(status_rel::RETURN.to_string()))?;
    Ok((document, link))
}

fn status_refresh_error(response: &HttpResponse) -> LicenseError {
    if response.is_server_error() {
        LicenseError::Network(format!("status refresh failed with HTTP {}", response.status))
    } else {
        LicenseError::RenewFailed(format!("status refresh failed with HTTP {}", response.status))
    }
}
