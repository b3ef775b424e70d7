//! Paid actions (PDF download, share link) and the checkout return flow.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::api_client::{ApiError, CvApi};
use crate::models::CvId;
use crate::routes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaidAction {
    Download,
    Share,
}

impl PaidAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PaidAction::Download => "download",
            PaidAction::Share => "share",
        }
    }
}

impl fmt::Display for PaidAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown paid action '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for PaidAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "download" => Ok(PaidAction::Download),
            "share" => Ok(PaidAction::Share),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// Where the payment provider wants the user to go next.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaidActionOutcome {
    /// Open this url to pay; the provider returns to the payment-success route.
    Checkout { url: String },
    ShareLink { link: String },
}

/// Requests a paid action for a CV that already has a server identity.
pub async fn request_action(
    api: &dyn CvApi,
    id: &CvId,
    action: PaidAction,
) -> Result<PaidActionOutcome, ApiError> {
    info!("Requesting {} for CV {}", action, id);
    match action {
        PaidAction::Download => {
            let session = api.create_checkout_session(id, action).await?;
            Ok(PaidActionOutcome::Checkout { url: session.url })
        }
        PaidAction::Share => {
            let link = api.share_link(id).await?;
            Ok(PaidActionOutcome::ShareLink { link })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentDelivery {
    Pdf { file_name: String, bytes: Bytes },
    ShareLink(String),
}

/// Result of returning from checkout. Every variant carries the route to
/// navigate to afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentCompletion {
    /// The callback lacked a usable `cvId` or `action`.
    Invalid { redirect: String },
    Delivered {
        redirect: String,
        delivery: PaymentDelivery,
    },
    Failed { redirect: String, message: String },
}

impl PaymentCompletion {
    pub fn redirect(&self) -> &str {
        match self {
            PaymentCompletion::Invalid { redirect }
            | PaymentCompletion::Delivered { redirect, .. }
            | PaymentCompletion::Failed { redirect, .. } => redirect,
        }
    }
}

/// Handles the payment-success callback query (`cvId`, `action`).
pub async fn complete_payment(
    api: &dyn CvApi,
    query: &HashMap<String, String>,
) -> PaymentCompletion {
    let id = query.get("cvId").and_then(|raw| CvId::new(raw.as_str()));
    let action = query.get("action").map(|raw| raw.parse::<PaidAction>());

    let (id, action) = match (id, action) {
        (Some(id), Some(Ok(action))) => (id, action),
        (_, Some(Err(e))) => {
            warn!("Payment callback with {e}");
            return invalid();
        }
        _ => {
            warn!("Payment callback without cvId or action");
            return invalid();
        }
    };

    let redirect = routes::editor_path(&id);
    let delivery = match action {
        PaidAction::Download => api.download_pdf(&id).await.map(|bytes| PaymentDelivery::Pdf {
            file_name: format!("CV_{id}.pdf"),
            bytes,
        }),
        PaidAction::Share => api.share_link(&id).await.map(PaymentDelivery::ShareLink),
    };

    match delivery {
        Ok(delivery) => {
            info!("Delivered {} for CV {} after payment", action, id);
            PaymentCompletion::Delivered { redirect, delivery }
        }
        Err(e) => {
            warn!("Post-payment {} failed for CV {}: {}", action, id, e);
            PaymentCompletion::Failed {
                redirect,
                message: e.user_message(),
            }
        }
    }
}

fn invalid() -> PaymentCompletion {
    PaymentCompletion::Invalid {
        redirect: routes::HOME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeCvApi;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_action_names() {
        assert_eq!("download".parse::<PaidAction>(), Ok(PaidAction::Download));
        assert_eq!("share".parse::<PaidAction>(), Ok(PaidAction::Share));
        assert!("print".parse::<PaidAction>().is_err());
        assert_eq!(serde_json::to_value(PaidAction::Share).unwrap(), "share");
    }

    #[tokio::test]
    async fn test_request_action_routes_download_through_checkout() {
        let api = FakeCvApi::new();
        let id = api.insert(crate::test_support::complete_draft());

        let outcome = request_action(&api, &id, PaidAction::Download).await.unwrap();
        assert_eq!(
            outcome,
            PaidActionOutcome::Checkout {
                url: format!("https://checkout.test/{id}/download")
            }
        );

        let outcome = request_action(&api, &id, PaidAction::Share).await.unwrap();
        assert_eq!(
            outcome,
            PaidActionOutcome::ShareLink {
                link: format!("https://cv.test/share/{id}")
            }
        );
    }

    #[tokio::test]
    async fn test_missing_context_redirects_home() {
        let api = FakeCvApi::new();
        for q in [
            query(&[]),
            query(&[("cvId", "65f1a2b3c4d5e6f708192a3b")]),
            query(&[("action", "download")]),
            query(&[("cvId", "65f1a2b3c4d5e6f708192a3b"), ("action", "print")]),
        ] {
            assert_eq!(
                complete_payment(&api, &q).await,
                PaymentCompletion::Invalid {
                    redirect: "/".to_string()
                }
            );
        }
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_download_delivers_named_pdf() {
        let api = FakeCvApi::new();
        let id = api.insert(crate::test_support::complete_draft());

        let completion =
            complete_payment(&api, &query(&[("cvId", id.as_str()), ("action", "download")])).await;
        assert_eq!(completion.redirect(), format!("/editor/{id}"));
        match completion {
            PaymentCompletion::Delivered {
                delivery: PaymentDelivery::Pdf { file_name, bytes },
                ..
            } => {
                assert_eq!(file_name, format!("CV_{id}.pdf"));
                assert!(bytes.starts_with(b"%PDF"));
            }
            other => panic!("unexpected completion: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_remote_failure_still_redirects_to_editor() {
        let api = FakeCvApi::new();
        let id = api.insert(crate::test_support::complete_draft());
        api.fail_next("share service down");

        let completion =
            complete_payment(&api, &query(&[("cvId", id.as_str()), ("action", "share")])).await;
        assert_eq!(
            completion,
            PaymentCompletion::Failed {
                redirect: format!("/editor/{id}"),
                message: "share service down".to_string(),
            }
        );
    }
}
