use std::path::Path;
use std::process::Command;

use crate::document::PrintModel;
use crate::error::{DeskError, Result};

/// Embedded Typst template for printed documents.
/// Uses a placeholder that gets replaced with the actual JSON file path.
const DOCUMENT_TEMPLATE: &str = r##"// Desk document template
// Data is loaded from JSON file

#let data = json("DATA_JSON_PATH")

#set page(
  paper: "us-letter",
  margin: (top: 0.8in, bottom: 0.8in, left: 0.8in, right: 0.8in),
)

#set text(font: "Helvetica", size: 10pt, lang: "es")

#let present(value) = value != none and value != ""

// Header with organization info and document details
#grid(
  columns: (1fr, 1fr),
  align: (left, right),
  [
    #text(size: 16pt, weight: "bold")[#data.organization.name]
    #v(0.3em)
    #if present(data.organization.tax_id) [RNC: #data.organization.tax_id \ ]
    #if present(data.organization.address) [#data.organization.address \ ]
    #if present(data.organization.contact) [#data.organization.contact]
  ],
  [
    #text(size: 18pt, weight: "bold")[#data.title]
    #v(0.5em)
    #table(
      columns: (auto, auto),
      stroke: none,
      align: (right, left),
      inset: 2pt,
      [*No.:*], [#data.document_number],
      [*Fecha:*], [#data.issue_date],
      ..if present(data.due_date) { ([*Vence:*], [#data.due_date]) } else { () },
    )
  ]
)

#v(1em)
#line(length: 100%, stroke: 0.5pt + gray)
#v(1em)

#text(weight: "bold", size: 11pt)[Cliente:]
#v(0.3em)
#text(weight: "bold")[#data.client.name]
#if present(data.client.tax_id) [ \ RNC/Cédula: #data.client.tax_id]
#if present(data.client.address) [ \ #data.client.address]
#if present(data.client.city) [ \ #data.client.city]
#if present(data.client.phone) [ \ Tel: #data.client.phone]

#v(1.5em)

#let with-days = data.days != none

#table(
  columns: if with-days { (1fr, auto, auto, auto, auto, auto, auto) } else { (1fr, auto, auto, auto, auto, auto) },
  align: (x, y) => if x == 0 { left } else { right },
  stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else { (bottom: 0.5pt + gray) },
  inset: 6pt,
  fill: (x, y) => if y == 0 { luma(240) } else { none },

  ..if with-days {
    ([*Producto*], [*Cant.*], [*Precio*], [*Días*], [*Desc.*], [*Imp.*], [*Subtotal*])
  } else {
    ([*Producto*], [*Cant.*], [*Precio*], [*Desc.*], [*Imp.*], [*Subtotal*])
  },

  ..data.line_rows.map(row => {
    let cells = (row.name, str(row.quantity), row.unit_price)
    if with-days { cells.push(str(data.days)) }
    cells + (row.discount_pct, row.tax_label, row.line_subtotal)
  }).flatten()
)

#v(1em)

#align(right)[
  #table(
    columns: (auto, auto),
    stroke: none,
    align: (right, right),
    inset: 5pt,

    [Subtotal:], [#data.totals_text.subtotal],

    ..if data.totals.tax_amount > 0 {
      ([ITBIS (#str(data.tax_rate)%):], [#data.totals_text.tax_amount])
    } else {
      ()
    },

    ..if data.totals.discount_amount > 0 {
      ([Descuento:], [-#data.totals_text.discount_amount])
    } else {
      ()
    },

    table.hline(stroke: 1pt),
    [*TOTAL:*], [*#data.totals_text.total*],

    ..data.summary_rows.map(r => ([#r.label:], [#r.value])).flatten()
  )
]

#if present(data.notes) [
  #v(1em)
  #text(weight: "bold")[Notas:] #data.notes
]

#v(4em)
#line(length: 40%, stroke: 0.5pt)
Firma autorizada \
#data.signature_block.signer
"##;

/// Compile a print model to PDF with the Typst CLI
pub fn generate_pdf(model: &PrintModel, output_path: &Path) -> Result<()> {
    // Check if typst is available
    let typst_check = Command::new("typst").arg("--version").output();

    if typst_check.is_err() {
        return Err(DeskError::TypstNotFound);
    }

    let temp_dir = std::env::temp_dir().join("desk-cli");
    std::fs::create_dir_all(&temp_dir)?;

    let json_data =
        serde_json::to_string(model).map_err(|e| DeskError::PdfGeneration(e.to_string()))?;

    let json_path = temp_dir.join("document.json");
    std::fs::write(&json_path, &json_data)?;

    // data.json sits next to the template, so the path stays relative
    let template_content = DOCUMENT_TEMPLATE.replace("DATA_JSON_PATH", "document.json");
    let template_path = temp_dir.join("document.typ");
    std::fs::write(&template_path, &template_content)?;

    tracing::debug!(output = %output_path.display(), "running typst compile");
    let output = Command::new("typst")
        .arg("compile")
        .arg("--root")
        .arg(&temp_dir)
        .arg(&template_path)
        .arg(output_path)
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DeskError::PdfGeneration(stderr.to_string()));
    }

    let _ = std::fs::remove_file(&template_path);
    let _ = std::fs::remove_file(&json_path);

    Ok(())
}
