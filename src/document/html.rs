use std::fmt::Write;

use super::PrintModel;

const STYLE: &str = r#"
body { font-family: Helvetica, Arial, sans-serif; font-size: 11px; color: #222; margin: 24px; }
.header { display: flex; justify-content: space-between; border-bottom: 2px solid #333; padding-bottom: 8px; }
.company-name { font-size: 18px; font-weight: bold; }
.document-type { font-size: 20px; font-weight: bold; text-align: right; }
.document-number { text-align: right; }
.section-title { font-weight: bold; margin-top: 14px; text-transform: uppercase; }
table { width: 100%; border-collapse: collapse; margin-top: 8px; }
th { background: #eee; text-align: left; padding: 4px; border-bottom: 1px solid #333; }
td { padding: 4px; border-bottom: 1px solid #ddd; }
.text-right { text-align: right; }
.text-center { text-align: center; }
.totals { width: 40%; margin-left: auto; margin-top: 12px; }
.totals-row { display: flex; justify-content: space-between; padding: 2px 0; }
.total { font-weight: bold; border-top: 1px solid #333; }
.signature { margin-top: 48px; width: 40%; border-top: 1px solid #333; text-align: center; }
.notes { margin-top: 12px; padding: 6px; background: #f8f8f8; border-left: 2px solid #666; }
"#;

/// Escape text for HTML element content and attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn totals_row(out: &mut String, class: &str, label: &str, value: &str) {
    let _ = write!(
        out,
        r#"<div class="totals-row{class}"><span>{}</span><span>{}</span></div>"#,
        escape(label),
        escape(value)
    );
}

/// Render a print model as a standalone HTML page
pub fn render(model: &PrintModel) -> String {
    let mut out = String::new();
    let org = &model.organization;
    let client = &model.client;

    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n<title>{} {}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n",
        escape(&model.title),
        escape(&model.document_number)
    );

    out.push_str("<div class=\"header\">\n<div>\n");
    if !org.logo_ref.is_empty() {
        let _ = writeln!(out, r#"<img src="{}" alt="logo" height="48">"#, escape(&org.logo_ref));
    }
    let _ = writeln!(out, r#"<div class="company-name">{}</div>"#, escape(&org.name));
    for line in [&org.tax_id, &org.address, &org.contact] {
        if !line.is_empty() {
            let _ = writeln!(out, "<div>{}</div>", escape(line));
        }
    }
    out.push_str("</div>\n<div>\n");
    let _ = writeln!(
        out,
        r#"<div class="document-type">{}</div>"#,
        escape(&model.title)
    );
    let _ = writeln!(
        out,
        r#"<div class="document-number">No. {}<br>Fecha: {}"#,
        escape(&model.document_number),
        escape(&model.issue_date)
    );
    if !model.due_date.is_empty() {
        let _ = write!(out, "<br>Vence: {}", escape(&model.due_date));
    }
    out.push_str("</div>\n</div>\n</div>\n");

    out.push_str("<div class=\"section-title\">Cliente</div>\n");
    let _ = writeln!(out, "<div><strong>{}</strong></div>", escape(&client.name));
    for (label, value) in [
        ("RNC/Cédula", &client.tax_id),
        ("Dirección", &client.address),
        ("Ciudad", &client.city),
        ("Teléfono", &client.phone),
    ] {
        if !value.is_empty() {
            let _ = writeln!(out, "<div>{}: {}</div>", label, escape(value));
        }
    }

    out.push_str("<table>\n<thead><tr><th>Producto</th><th class=\"text-center\">Cant.</th><th class=\"text-right\">Precio</th>");
    if model.days.is_some() {
        out.push_str("<th class=\"text-center\">Días</th>");
    }
    out.push_str("<th class=\"text-center\">Desc.</th><th class=\"text-center\">Imp.</th><th class=\"text-right\">Subtotal</th></tr></thead>\n<tbody>\n");
    for line in &model.line_rows {
        let _ = write!(
            out,
            r#"<tr><td>{}</td><td class="text-center">{}</td><td class="text-right">{}</td>"#,
            escape(&line.name),
            line.quantity,
            escape(&line.unit_price)
        );
        if let Some(days) = model.days {
            let _ = write!(out, r#"<td class="text-center">{days}</td>"#);
        }
        let _ = writeln!(
            out,
            r#"<td class="text-center">{}</td><td class="text-center">{}</td><td class="text-right">{}</td></tr>"#,
            escape(&line.discount_pct),
            line.tax_label,
            escape(&line.line_subtotal)
        );
    }
    out.push_str("</tbody>\n</table>\n");

    out.push_str("<div class=\"totals\">\n");
    let text = &model.totals_text;
    totals_row(&mut out, "", "Subtotal:", &text.subtotal);
    if model.totals.tax_amount > 0.0 {
        totals_row(
            &mut out,
            "",
            &format!("ITBIS ({}%):", model.tax_rate),
            &text.tax_amount,
        );
    }
    if model.totals.discount_amount > 0.0 {
        totals_row(&mut out, "", "Descuento:", &format!("-{}", text.discount_amount));
    }
    totals_row(&mut out, " total", "TOTAL:", &text.total);
    for summary in &model.summary_rows {
        totals_row(&mut out, "", &format!("{}:", summary.label), &summary.value);
    }
    out.push_str("</div>\n");

    if !model.notes.is_empty() {
        let _ = writeln!(
            out,
            "<div class=\"notes\"><strong>NOTAS:</strong><div>{}</div></div>",
            escape(&model.notes).replace('\n', "<br>")
        );
    }

    out.push_str("<div class=\"signature\">\n");
    if !model.signature_block.stamp_ref.is_empty() {
        let _ = writeln!(
            out,
            r#"<img src="{}" alt="sello" height="64"><br>"#,
            escape(&model.signature_block.stamp_ref)
        );
    }
    let _ = writeln!(
        out,
        "Firma autorizada<br>{}",
        escape(&model.signature_block.signer)
    );
    out.push_str("</div>\n</body>\n</html>\n");
    out
}
