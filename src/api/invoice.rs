use std::collections::BTreeMap;
use std::time::Duration;

use crate::{
    api::email::{DeliveryMode, deliver},
    auth::auth::AuthUser,
    config::Config,
    error::ApiError,
    model::{
        invoice::{Invoice, InvoiceWeek, invoice_number},
        timesheet::Attachment,
    },
    services::{
        invoice::{build_invoice_html, decode_attachments, month_name, summarize_month},
        mailer::OutgoingAttachment,
        pdf::render_pdf,
    },
    store::AppStore,
    sync::{SyncList, SyncService},
    utils::audit,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

const INVOICE_ACCOUNT: &str = "invoice";
const INVOICE_SUBJECT: &str = "Invoice from CentraPro";
const PDF_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct InvoiceQuery {
    pub employee_id: Option<u64>,
    /// Month name, e.g. `December`
    pub month: Option<String>,
    pub year: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoice {
    pub invoice_number: Option<String>,
    pub employee_id: Option<u64>,
    pub employee_name: Option<String>,
    pub month: Option<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub total_hours: f64,
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub total_amount: f64,
    #[schema(example = "Draft")]
    pub status: Option<String>,
    pub recipient: Option<String>,
    pub client_name: Option<String>,
    #[serde(default)]
    pub weeks: Vec<InvoiceWeek>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateInvoiceReq {
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = 12)]
    pub month: u32,
    #[schema(example = 2025)]
    pub year: i32,
}

/// Invoice fields carried along with a send request.
#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SendInvoiceMeta {
    /// Marks this stored invoice as sent instead of storing a new one.
    pub id: Option<u64>,
    pub employee_id: Option<u64>,
    pub month: Option<String>,
    pub year: Option<i32>,
    pub client_name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendInvoiceReq {
    pub to: Option<String>,
    pub vendor_email: Option<String>,
    pub employee_name: Option<String>,
    #[serde(default)]
    pub weeks: Vec<InvoiceWeek>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub include_timesheet_attachments: bool,
    pub invoice: Option<SendInvoiceMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct InvoiceResponse {
    pub success: bool,
    pub invoice: Invoice,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendInvoiceResponse {
    pub success: bool,
    #[schema(example = "Invoice sent (demo mode)")]
    pub message: String,
    pub total_hours: f64,
    pub total_amount: f64,
    pub invoice_id: u64,
}

/// List invoices
#[utoipa::path(
    get,
    path = "/api/invoices",
    params(InvoiceQuery),
    responses((status = 200, description = "Matching invoices", body = [Invoice])),
    tag = "Invoice",
    security(("bearer_auth" = []))
)]
pub async fn list_invoices(
    store: web::Data<AppStore>,
    query: web::Query<InvoiceQuery>,
) -> actix_web::Result<impl Responder> {
    let invoices = store.invoices.filter(|inv| {
        query.employee_id.is_none_or(|e| inv.employee_id == Some(e))
            && query.year.is_none_or(|y| inv.year == Some(y))
            && query.month.as_deref().is_none_or(|m| {
                inv.month
                    .as_deref()
                    .is_some_and(|month| month.eq_ignore_ascii_case(m))
            })
    });
    Ok(HttpResponse::Ok().json(invoices))
}

/// Store an invoice
#[utoipa::path(
    post,
    path = "/api/invoices",
    request_body = CreateInvoice,
    responses((status = 200, description = "Invoice stored", body = InvoiceResponse)),
    tag = "Invoice",
    security(("bearer_auth" = []))
)]
pub async fn create_invoice(
    auth: AuthUser,
    store: web::Data<AppStore>,
    sync: web::Data<SyncService>,
    payload: web::Json<CreateInvoice>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();

    let invoice = store.invoices.insert_with(|id| Invoice {
        id,
        invoice_number: payload.invoice_number.unwrap_or_else(|| invoice_number(id)),
        employee_id: payload.employee_id,
        employee_name: payload.employee_name,
        month: payload.month,
        year: payload.year,
        total_hours: payload.total_hours,
        hourly_rate: payload.hourly_rate,
        total_amount: payload.total_amount,
        status: payload.status.unwrap_or_else(|| "Draft".to_string()),
        recipient: payload.recipient,
        client_name: payload.client_name,
        weeks: payload.weeks,
        created_at: Utc::now(),
        sent_at: None,
        extra: payload.extra,
    });

    audit::record(
        &store,
        &auth,
        "create",
        "invoice",
        Some(invoice.id),
        format!("Stored invoice {}", invoice.invoice_number),
    );
    sync.push(SyncList::Invoices, &invoice);

    Ok(HttpResponse::Ok().json(InvoiceResponse {
        success: true,
        invoice,
    }))
}

/// Generate a monthly invoice
///
/// Needs timesheets in at least the configured number of distinct weeks of that month.
#[utoipa::path(
    post,
    path = "/api/invoices/generate",
    request_body = GenerateInvoiceReq,
    responses(
        (status = 200, description = "Invoice generated", body = InvoiceResponse),
        (status = 400, description = "Month out of range"),
        (status = 422, description = "Not enough weeks", body = Object, example = json!({
            "error": "Employee has only 2 complete weeks submitted. Need at least 4 weeks to generate invoice."
        }))
    ),
    tag = "Invoice",
    security(("bearer_auth" = []))
)]
pub async fn generate_invoice(
    auth: AuthUser,
    config: web::Data<Config>,
    store: web::Data<AppStore>,
    sync: web::Data<SyncService>,
    payload: web::Json<GenerateInvoiceReq>,
) -> actix_web::Result<impl Responder> {
    let GenerateInvoiceReq {
        employee_id,
        month,
        year,
    } = payload.into_inner();

    let month_label =
        month_name(month).ok_or_else(|| ApiError::bad_request("Month must be between 1 and 12"))?;

    let summary = summarize_month(&store.timesheets.all(), employee_id, year, month);
    if summary.weeks < config.invoice_min_weeks {
        return Err(ApiError::Unprocessable(format!(
            "Employee has only {} complete weeks submitted. Need at least {} weeks to generate invoice.",
            summary.weeks, config.invoice_min_weeks
        ))
        .into());
    }

    let employee_name = store.employees.find(employee_id).map(|e| e.name);
    let rate = config.invoice_hourly_rate;

    let invoice = store.invoices.insert_with(|id| Invoice {
        id,
        invoice_number: invoice_number(id),
        employee_id: Some(employee_id),
        employee_name,
        month: Some(month_label.to_string()),
        year: Some(year),
        total_hours: summary.total_hours,
        hourly_rate: Some(rate),
        total_amount: summary.total_hours * rate,
        status: "Generated".to_string(),
        recipient: None,
        client_name: None,
        weeks: Vec::new(),
        created_at: Utc::now(),
        sent_at: None,
        extra: BTreeMap::new(),
    });

    info!(
        invoice_id = invoice.id,
        employee_id,
        weeks = summary.weeks,
        total_hours = invoice.total_hours,
        "Invoice generated"
    );
    audit::record(
        &store,
        &auth,
        "generate",
        "invoice",
        Some(invoice.id),
        format!("{month_label} {year} for employee {employee_id}"),
    );
    sync.push(SyncList::Invoices, &invoice);

    Ok(HttpResponse::Ok().json(InvoiceResponse {
        success: true,
        invoice,
    }))
}

/// The invoice document itself: a PDF when a renderer is configured, HTML otherwise.
async fn invoice_document(config: &Config, html: &str) -> OutgoingAttachment {
    let stamp = Utc::now().timestamp_millis();

    if let Some(command) = config.invoice_pdf_command.as_deref() {
        match render_pdf(command, html, PDF_TIMEOUT).await {
            Ok(content) => {
                return OutgoingAttachment {
                    filename: format!("Invoice-{stamp}.pdf"),
                    content,
                    content_type: "application/pdf".to_string(),
                };
            }
            Err(e) => warn!(error = %e, "PDF rendering failed, attaching HTML invoice"),
        }
    }

    OutgoingAttachment {
        filename: format!("Invoice-{stamp}.html"),
        content: html.as_bytes().to_vec(),
        content_type: "text/html".to_string(),
    }
}

/// E-mail an invoice
///
/// Builds the invoice table from `weeks`, attaches the invoice document and any
/// timesheet files, then sends it through the invoice SMTP account. Without a
/// configured account the send is logged and reported as demo mode.
#[utoipa::path(
    post,
    path = "/api/invoices/send",
    request_body = SendInvoiceReq,
    responses(
        (status = 200, description = "Sent or logged", body = SendInvoiceResponse),
        (status = 400, description = "No recipient or bad attachment data", body = Object, example = json!({
            "error": "Recipient email required"
        }))
    ),
    tag = "Invoice",
    security(("bearer_auth" = []))
)]
pub async fn send_invoice(
    auth: AuthUser,
    config: web::Data<Config>,
    store: web::Data<AppStore>,
    payload: web::Json<SendInvoiceReq>,
) -> actix_web::Result<impl Responder> {
    let req = payload.into_inner();
    let recipient = [req.to.as_deref(), req.vendor_email.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|r| !r.is_empty())
        .ok_or_else(|| ApiError::bad_request("Recipient email required"))?
        .to_string();

    let document = build_invoice_html(req.employee_name.as_deref(), &req.weeks);

    let mut attachments = Vec::new();
    for week in &req.weeks {
        attachments.extend(decode_attachments(&week.attachments)?);
    }
    if req.include_timesheet_attachments {
        attachments.extend(decode_attachments(&req.attachments)?);
    }
    attachments.insert(0, invoice_document(&config, &document.html).await);

    info!(
        to = %recipient,
        weeks = req.weeks.len(),
        attachments = attachments.len(),
        "Sending invoice"
    );

    let mode = deliver(
        &store,
        &config,
        INVOICE_ACCOUNT,
        recipient.clone(),
        INVOICE_SUBJECT.to_string(),
        document.html,
        attachments,
    )
    .await;

    let meta = req.invoice.unwrap_or_default();
    let now = Utc::now();
    let mark_sent = |inv: &mut Invoice| {
        inv.status = "Sent".to_string();
        inv.recipient = Some(recipient.clone());
        inv.total_hours = document.total_hours;
        inv.total_amount = document.total_amount;
        inv.sent_at = Some(now);
        if !req.weeks.is_empty() {
            inv.weeks = req.weeks.clone();
        }
    };

    let invoice = match meta.id.and_then(|id| store.invoices.update(id, mark_sent)) {
        Some(existing) => existing,
        None => store.invoices.insert_with(|id| {
            let mut invoice = Invoice {
                id,
                invoice_number: invoice_number(id),
                employee_id: meta.employee_id,
                employee_name: req.employee_name.clone(),
                month: meta.month,
                year: meta.year,
                total_hours: 0.0,
                hourly_rate: None,
                total_amount: 0.0,
                status: String::new(),
                recipient: None,
                client_name: meta.client_name,
                weeks: Vec::new(),
                created_at: now,
                sent_at: None,
                extra: BTreeMap::new(),
            };
            mark_sent(&mut invoice);
            invoice
        }),
    };

    audit::record(
        &store,
        &auth,
        "send",
        "invoice",
        Some(invoice.id),
        format!("{} sent to {recipient}", invoice.invoice_number),
    );

    let message = match mode {
        DeliveryMode::Delivered => "Invoice sent successfully",
        DeliveryMode::Demo => "Invoice sent (demo mode)",
    };
    Ok(HttpResponse::Ok().json(SendInvoiceResponse {
        success: true,
        message: message.to_string(),
        total_hours: document.total_hours,
        total_amount: document.total_amount,
        invoice_id: invoice.id,
    }))
}
