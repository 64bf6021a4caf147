//! Conversion of raw API items and grid rows into [`InvoiceRecord`]s.
//!
//! Both input shapes go through the same canonicalization (status labels,
//! date and amount formatting, share links) and the same validity check, so
//! a record looks identical whichever acquisition strategy produced it.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;

use super::format::{
    external_link, format_amount, format_amount_text, format_date, format_decimal,
    localize_status, parse_amount,
};
use super::markers::{
    Column, CELL_LINK_SELECTOR, CELL_SUBTITLE_SELECTOR, CELL_TITLE_SELECTOR, ROW_SELECTOR,
};
use crate::models::InvoiceRecord;

static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse(ROW_SELECTOR).unwrap());
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(CELL_TITLE_SELECTOR).unwrap());
static SUBTITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(CELL_SUBTITLE_SELECTOR).unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse(CELL_LINK_SELECTOR).unwrap());
static COLUMNS: LazyLock<Vec<(Column, Selector)>> = LazyLock::new(|| {
    Column::ALL
        .iter()
        .map(|column| (*column, Selector::parse(&column.selector()).unwrap()))
        .collect()
});

/// One raw invoice as found by an acquisition strategy.
#[derive(Debug, Clone, Copy)]
pub enum RawInvoice<'a> {
    /// Item from the documents API's JSON payload.
    Api(&'a Value),
    /// Row element of the rendered grid.
    Row(ElementRef<'a>),
}

/// Normalize a raw invoice without applying the validity check.
pub fn normalize(raw: RawInvoice<'_>, page_number: u32, index_within_page: usize) -> InvoiceRecord {
    match raw {
        RawInvoice::Api(item) => normalize_api_item(item, page_number, index_within_page),
        RawInvoice::Row(row) => normalize_row(row, page_number, index_within_page),
    }
}

/// Normalize a raw invoice, discarding it if it carries no identifier.
pub fn normalize_valid(
    raw: RawInvoice<'_>,
    page_number: u32,
    index_within_page: usize,
) -> Option<InvoiceRecord> {
    let record = normalize(raw, page_number, index_within_page);
    if record.is_valid() {
        Some(record)
    } else {
        debug!(
            "Discarding invalid record at page {} index {}",
            page_number, index_within_page
        );
        None
    }
}

/// Normalize every item of one API page, keeping source order.
pub fn normalize_items(items: &[Value], page_number: u32) -> Vec<InvoiceRecord> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| normalize_valid(RawInvoice::Api(item), page_number, index))
        .collect()
}

/// Extract and normalize every grid row of a rendered document.
pub fn extract_rows(html: &str, page_number: u32) -> Vec<InvoiceRecord> {
    let document = Html::parse_document(html);
    document
        .select(&ROW)
        .enumerate()
        .filter_map(|(index, row)| normalize_valid(RawInvoice::Row(row), page_number, index))
        .collect()
}

/// Map one documents-API item to a record.
pub fn normalize_api_item(item: &Value, page_number: u32, index_within_page: usize) -> InvoiceRecord {
    let mut record = InvoiceRecord::new(page_number, index_within_page);

    record.electronic_number = string_field(item, &["uuid", "UUID"]);
    record.external_link = external_link(&record.electronic_number);
    record.internal_number = string_field(item, &["internalId", "internalID"]);
    record.document_type = string_field(
        item,
        &["typeName", "documentTypeNamePrimaryLang", "documentType"],
    );
    record.document_version = string_field(
        item,
        &["typeVersionName", "documentTypeVersion", "typeVersion"],
    );
    record.status = localize_status(&string_field(item, &["status"]));
    record.issue_date = format_date(&string_field(item, &["dateTimeIssued"]));
    record.submission_date = format_date(&string_field(item, &["dateTimeReceived"]));

    let total = field(item, &["total", "totalAmount"]);
    let net = field(item, &["totalSales", "netAmount"]);
    record.total_amount = format_amount(total);
    record.invoice_value = format_amount(net);
    record.vat_amount = match field(item, &["totalVAT", "taxTotal"]) {
        Some(vat) => format_amount(Some(vat)),
        None => match (parse_amount(total), parse_amount(net)) {
            (Some(total), Some(net)) => format_decimal(total - net),
            _ => String::new(),
        },
    };

    record.seller_name = string_field(item, &["issuerName"]);
    record.seller_tax_number = string_field(item, &["issuerId"]);
    record.buyer_name = string_field(item, &["receiverName"]);
    record.buyer_tax_number = string_field(item, &["receiverId"]);

    record
}

/// Map one grid row to a record; missing columns leave fields empty.
pub fn normalize_row(row: ElementRef<'_>, page_number: u32, index_within_page: usize) -> InvoiceRecord {
    let mut record = InvoiceRecord::new(page_number, index_within_page);

    for (column, selector) in COLUMNS.iter() {
        let Some(cell) = row.select(selector).next() else {
            continue;
        };
        let cell = CellText::read(cell);

        match column {
            Column::ElectronicNumber => {
                record.electronic_number = cell.primary_or_link();
                record.external_link = external_link(&record.electronic_number);
            }
            Column::InternalNumber => record.internal_number = cell.primary(),
            Column::DocumentType => {
                record.document_type = cell.primary();
                record.document_version = cell.subtitle.clone();
            }
            Column::Status => record.status = localize_status(&cell.primary()),
            Column::IssueDate => record.issue_date = format_date(&cell.primary()),
            Column::SubmissionDate => record.submission_date = format_date(&cell.primary()),
            Column::TotalAmount => record.total_amount = format_amount_text(&cell.primary()),
            Column::InvoiceValue => record.invoice_value = format_amount_text(&cell.primary()),
            Column::VatAmount => record.vat_amount = format_amount_text(&cell.primary()),
            Column::Seller => {
                record.seller_name = cell.primary();
                record.seller_tax_number = cell.subtitle.clone();
            }
            Column::Buyer => {
                record.buyer_name = cell.primary();
                record.buyer_tax_number = cell.subtitle.clone();
            }
        }
    }

    record
}

/// Text pulled out of one grid cell.
#[derive(Debug, Default)]
struct CellText {
    link: String,
    title: String,
    subtitle: String,
    text: String,
}

impl CellText {
    fn read(cell: ElementRef<'_>) -> Self {
        let first = |selector: &Selector| {
            cell.select(selector)
                .map(element_text)
                .find(|s| !s.is_empty())
                .unwrap_or_default()
        };
        Self {
            link: first(&LINK),
            title: first(&TITLE),
            subtitle: first(&SUBTITLE),
            text: element_text(cell),
        }
    }

    /// Title line if the cell has one, otherwise the whole cell text.
    fn primary(&self) -> String {
        if self.title.is_empty() {
            self.text.clone()
        } else {
            self.title.clone()
        }
    }

    fn primary_or_link(&self) -> String {
        if self.link.is_empty() {
            self.primary()
        } else {
            self.link.clone()
        }
    }
}

/// Whitespace-collapsed text content of an element.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First present, non-null field among `keys`.
fn field<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| item.get(*key))
        .find(|value| !value.is_null())
}

/// First present field among `keys`, rendered as a trimmed string.
fn string_field(item: &Value, keys: &[&str]) -> String {
    match field(item, keys) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const UUID: &str = "7ZQK1S0ABCDEFGHJKMNPQRSTVW123456";

    fn api_item() -> Value {
        json!({
            "uuid": UUID,
            "internalId": "INV-001",
            "typeName": "I",
            "typeVersionName": "1.0",
            "status": "Valid",
            "dateTimeIssued": "2024-03-15T10:20:30Z",
            "dateTimeReceived": "2024-03-16T08:00:00Z",
            "total": 1140,
            "totalSales": "1000",
            "issuerName": "Seller Co",
            "issuerId": "100200300",
            "receiverName": "Buyer Co",
            "receiverId": "400500600"
        })
    }

    #[test]
    fn test_normalize_api_item() {
        let record = normalize_api_item(&api_item(), 2, 3);
        assert_eq!(record.serial_number, 54);
        assert_eq!(record.page_number, 2);
        assert_eq!(record.electronic_number, UUID);
        assert_eq!(record.internal_number, "INV-001");
        assert_eq!(record.document_type, "I");
        assert_eq!(record.document_version, "1.0");
        assert_eq!(record.status, "صالحة");
        assert_eq!(record.issue_date, "15/03/2024");
        assert_eq!(record.submission_date, "16/03/2024");
        assert_eq!(record.total_amount, "1,140.00");
        assert_eq!(record.invoice_value, "1,000.00");
        assert_eq!(record.vat_amount, "140.00");
        assert_eq!(record.seller_tax_number, "100200300");
        assert_eq!(record.buyer_name, "Buyer Co");
        assert_eq!(record.invoice_currency, "EGP");
        assert!(record.external_link.ends_with("/share/7ZQK1S0ABCDEFGHJKMNPQRSTVW"));
    }

    #[test]
    fn test_unknown_status_and_raw_date_pass_through() {
        let item = json!({"uuid": "x", "status": "Foo", "dateTimeIssued": "soon"});
        let record = normalize_api_item(&item, 1, 0);
        assert_eq!(record.status, "Foo");
        assert_eq!(record.issue_date, "soon");
    }

    #[test]
    fn test_missing_id_leaves_link_empty() {
        let item = json!({"internalId": "A-1", "total": 0});
        let record = normalize_api_item(&item, 1, 0);
        assert!(record.electronic_number.is_empty());
        assert!(record.external_link.is_empty());
        assert!(record.total_amount.is_empty());
        assert!(record.is_valid());
    }

    #[test]
    fn test_normalize_items_drops_invalid() {
        let items = vec![api_item(), json!({"status": "Valid", "issuerName": "X"}), api_item()];
        let records = normalize_items(&items, 1);
        assert_eq!(records.len(), 2);
        // Serial numbers keep the source position of each row.
        assert_eq!(records[0].serial_number, 1);
        assert_eq!(records[1].serial_number, 3);
    }

    fn grid(rows: &str) -> String {
        format!(
            r#"<html><body><div class="ms-List">{}</div></body></html>"#,
            rows
        )
    }

    fn full_row(uuid: &str) -> String {
        format!(
            r#"<div class="ms-List-cell" data-list-index="0">
                <div class="ms-DetailsRow" role="row" data-automationid="DetailsRow">
                    <div data-automation-key="uuid"><a href="/documents/{uuid}">{uuid}</a></div>
                    <div data-automation-key="internalId"><span class="griCellTitle">INV-9</span></div>
                    <div data-automation-key="typeName">
                        <span class="griCellTitle">Invoice</span>
                        <span class="griCellSubTitle">1.0</span>
                    </div>
                    <div data-automation-key="status">Submitted</div>
                    <div data-automation-key="dateTimeIssued">2024-01-02</div>
                    <div data-automation-key="total">2,500.5 EGP</div>
                    <div data-automation-key="issuerName">
                        <span class="griCellTitle">Seller   Co</span>
                        <span class="griCellSubTitle">123456789</span>
                    </div>
                </div>
            </div>"#
        )
    }

    #[test]
    fn test_extract_rows_from_grid() {
        let html = grid(&format!("{}{}", full_row("AAA"), full_row("BBB")));
        let records = extract_rows(&html, 3);
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.serial_number, 101);
        assert_eq!(first.electronic_number, "AAA");
        assert_eq!(first.internal_number, "INV-9");
        assert_eq!(first.document_type, "Invoice");
        assert_eq!(first.document_version, "1.0");
        assert_eq!(first.status, "مقدمة");
        assert_eq!(first.issue_date, "02/01/2024");
        assert_eq!(first.total_amount, "2,500.50");
        assert_eq!(first.seller_name, "Seller Co");
        assert_eq!(first.seller_tax_number, "123456789");
        assert!(first.buyer_name.is_empty());
        assert_eq!(records[1].serial_number, 102);
        assert_eq!(records[1].electronic_number, "BBB");
    }

    #[test]
    fn test_partial_row_is_kept_when_valid() {
        let html = grid(
            r#"<div class="ms-List-cell"><div role="row">
                <div data-automation-key="total">15</div>
            </div></div>"#,
        );
        let records = extract_rows(&html, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_amount, "15.00");
        assert!(records[0].electronic_number.is_empty());
    }

    #[test]
    fn test_row_without_identifiers_is_dropped() {
        let html = grid(
            r#"<div class="ms-List-cell"><div role="row">
                <div data-automation-key="status">Valid</div>
            </div></div>"#,
        );
        assert!(extract_rows(&html, 1).is_empty());
        assert_eq!(Html::parse_document(&html).select(&ROW).count(), 1);
    }

    #[test]
    fn test_dispatch_shares_output_shape() {
        let item = api_item();
        let from_api = normalize(RawInvoice::Api(&item), 1, 0);

        let html = grid(&full_row(UUID));
        let document = Html::parse_document(&html);
        let row = document.select(&ROW).next().unwrap();
        let from_row = normalize(RawInvoice::Row(row), 1, 0);

        assert_eq!(from_api.serial_number, from_row.serial_number);
        assert_eq!(from_api.electronic_number, from_row.electronic_number);
        assert_eq!(from_api.external_link, from_row.external_link);
    }
}
