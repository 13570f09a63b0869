mod schemas;

use std::sync::Arc;

use async_trait::async_trait;
use bl_core::JobKind;
use bl_core::checkout::PaymentMethod;
use bl_core::error::{PaymentError, PollError};
use bl_core::job::JobStatusResponse;
use bl_core::payment::{CardCheckout, OrderConfirmation, OrderRequest, PaymentGateway};
use bl_core::poller::JobStatusSource;
use reqwest::{RequestBuilder, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::AppError;

pub use schemas::{JobCreateResponse, ListingMetadata, Submit3dRequest};
use schemas::{
    CardOrderResponse, CreateOrderBody, CreateOrderResponse, ErrorBody, VerifyPaymentBody,
    VerifyPaymentResponse,
};

pub const MIN_3D_IMAGES: usize = 2;

/// HTTP client for the marketplace API
#[derive(Clone)]
pub struct Backend {
    http: reqwest::Client,
    config: ClientConfig,
    card_checkout: Option<Arc<dyn CardCheckout>>,
}

impl Backend {
    pub fn new(config: ClientConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            http,
            config,
            card_checkout: None,
        })
    }

    /// Hosted checkout used to collect card payments. Without one, card
    /// orders are refused before anything is sent.
    pub fn with_card_checkout(mut self, checkout: Arc<dyn CardCheckout>) -> Self {
        self.card_checkout = Some(checkout);
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.config.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::BaseUrl(self.config.api_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn job_status(
        &self,
        job_id: &str,
        kind: JobKind,
    ) -> Result<JobStatusResponse, PollError> {
        let url = self
            .endpoint(&["jobs", job_id, "status"])
            .map_err(|e| PollError::Transport(e.to_string()))?;

        let response = self
            .authorized(self.http.get(url))
            .query(&[("type", kind.id())])
            .send()
            .await
            .map_err(|e| PollError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PollError::Status {
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| PollError::Decode(e.to_string()))
    }

    /// Queue a 3D model generation job for a listing's photos
    pub async fn submit_3d_job(
        &self,
        request: &Submit3dRequest,
    ) -> Result<JobCreateResponse, AppError> {
        if request.images.len() < MIN_3D_IMAGES {
            return Err(AppError::NotEnoughImages {
                required: MIN_3D_IMAGES,
                given: request.images.len(),
            });
        }

        let url = self.endpoint(&["jobs", "submit-3d"])?;
        let response = self
            .authorized(self.http.post(url))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(AppError::BackendError {
                status,
                message: error_message(response).await,
            });
        }

        let created: JobCreateResponse = response.json().await?;
        info!(job_id = %created.job_id, status = %created.status, "3D job submitted");
        Ok(created)
    }

    /// Places a single-listing order. Stored credit is charged by the
    /// backend directly; a card order is opened, paid through the hosted
    /// checkout and only confirmed once the backend has verified the payment.
    pub async fn create_order(
        &self,
        request: &OrderRequest,
    ) -> Result<OrderConfirmation, PaymentError> {
        let Some(body) = CreateOrderBody::from_request(request) else {
            let message = match request.items.len() {
                0 => "Checkout has no items".to_string(),
                count => format!("An order covers a single listing, checkout has {count}"),
            };
            return Err(PaymentError::Rejected(message));
        };

        match request.payment_method {
            PaymentMethod::StoredCredit => self.credit_order(&body).await,
            PaymentMethod::Card => self.card_order(&body).await,
        }
    }

    async fn credit_order(
        &self,
        body: &CreateOrderBody<'_>,
    ) -> Result<OrderConfirmation, PaymentError> {
        let created: CreateOrderResponse = self.post_payment("create-credit-order", body).await?;

        let mut confirmation = created.order;
        if confirmation.message.is_none() {
            confirmation.message = created.message;
        }
        Ok(confirmation)
    }

    async fn card_order(
        &self,
        body: &CreateOrderBody<'_>,
    ) -> Result<OrderConfirmation, PaymentError> {
        let checkout = self.card_checkout.as_ref().ok_or_else(|| {
            PaymentError::Rejected("Card payments are not available in this client".into())
        })?;

        let created: CardOrderResponse = self.post_payment("create-order", body).await?;
        let pending = created.order;
        info!(
            order_id = %pending.order_id,
            razorpay_order_id = %pending.razorpay_order_id,
            "Card order opened, awaiting payment"
        );

        let authorization = checkout.authorize(&pending).await.inspect_err(|err| {
            info!(order_id = %pending.order_id, error = %err, "Card payment not completed");
        })?;

        let verify = VerifyPaymentBody {
            authorization: &authorization,
            order_id: &pending.id,
        };
        let verified: VerifyPaymentResponse = self.post_payment("verify", &verify).await?;
        info!(
            order_id = %verified.order.order_id,
            status = verified.order.status.as_deref().unwrap_or("unknown"),
            "Card payment verified"
        );

        Ok(OrderConfirmation {
            order_id: verified.order.order_id,
            amount: Some(pending.amount / 100),
            message: verified.message,
        })
    }

    /// POST to `payment/{route}`; non-2xx `{error}` bodies become rejections
    async fn post_payment<B, T>(&self, route: &str, body: &B) -> Result<T, PaymentError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .endpoint(&["payment", route])
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        debug!(%url, "Payment request");
        let response = self
            .authorized(self.http.post(url))
            .json(body)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PaymentError::Rejected(error_message(response).await));
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::Decode(e.to_string()))
    }
}

/// The API's `{ "error": ... }` body, or the status line when absent
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.is_empty() => format!("HTTP {status}"),
        Err(_) => format!("HTTP {status}: {body}"),
    }
}

#[async_trait]
impl JobStatusSource for Backend {
    async fn fetch_status(
        &self,
        job_id: &str,
        kind: JobKind,
    ) -> Result<JobStatusResponse, PollError> {
        self.job_status(job_id, kind).await
    }
}

#[async_trait]
impl PaymentGateway for Backend {
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderConfirmation, PaymentError> {
        self.create_order(request).await
    }
}
