//! Markup markers used by the portal's virtualized result grid.

/// Rows rendered by the virtualized list (Fluent UI `DetailsList`).
pub const ROW_SELECTOR: &str =
    r#"div.ms-DetailsRow[data-automationid="DetailsRow"], div.ms-List-cell > div[role="row"]"#;

/// Primary line inside a multi-line cell.
pub const CELL_TITLE_SELECTOR: &str = ".griCellTitle, .griCellTitleGray";

/// Secondary line inside a multi-line cell.
pub const CELL_SUBTITLE_SELECTOR: &str = ".griCellSubTitle";

/// Links inside a cell (the document id column links to the details page).
pub const CELL_LINK_SELECTOR: &str = "a";

/// Active button of the pager.
pub const ACTIVE_PAGE_SELECTOR: &str = concat!(
    r#".eta-pagination .is-checked, .eta-pagination .is-selected, "#,
    r#"[class*="pagination"] [aria-current="page"], "#,
    r#"[class*="pagination"] [aria-selected="true"], "#,
    r#"[class*="pagination"] .is-checked"#
);

/// Grid columns, keyed by their `data-automation-key` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    ElectronicNumber,
    InternalNumber,
    DocumentType,
    Status,
    IssueDate,
    SubmissionDate,
    TotalAmount,
    InvoiceValue,
    VatAmount,
    Seller,
    Buyer,
}

impl Column {
    pub const ALL: [Column; 11] = [
        Column::ElectronicNumber,
        Column::InternalNumber,
        Column::DocumentType,
        Column::Status,
        Column::IssueDate,
        Column::SubmissionDate,
        Column::TotalAmount,
        Column::InvoiceValue,
        Column::VatAmount,
        Column::Seller,
        Column::Buyer,
    ];

    /// Value of the cell's `data-automation-key` attribute.
    pub fn marker(self) -> &'static str {
        match self {
            Column::ElectronicNumber => "uuid",
            Column::InternalNumber => "internalId",
            Column::DocumentType => "typeName",
            Column::Status => "status",
            Column::IssueDate => "dateTimeIssued",
            Column::SubmissionDate => "dateTimeReceived",
            Column::TotalAmount => "total",
            Column::InvoiceValue => "totalSales",
            Column::VatAmount => "totalVAT",
            Column::Seller => "issuerName",
            Column::Buyer => "receiverName",
        }
    }

    /// CSS selector matching this column's cell within a row.
    pub fn selector(self) -> String {
        format!(r#"[data-automation-key="{}"]"#, self.marker())
    }
}
