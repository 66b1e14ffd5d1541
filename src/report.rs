use crate::invoice::{Invoice, LineItem};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use serde_json::Value;

const MONEY_FORMAT: &str = "#,##0.00";

/// Which item field a report column renders.
enum ItemField {
    Sn,
    Particulars,
    Hsn,
    Quantity,
    Rate,
    Gross,
    Discount,
    TaxRate,
    Amount,
}

struct Column {
    title: &'static str,
    width: f64,
    field: ItemField,
}

/// Renders the reconciled invoice as an xlsx workbook in memory.
///
/// Business bills get the full invoice table; personal bills get the
/// plain expense sheet. Columns that would be empty on every line
/// (HSN codes, discounts, quantities) are left out of the table.
pub fn render_report(invoice: &Invoice) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    {
        let worksheet = workbook.add_worksheet();
        if invoice.layout.is_personal() {
            worksheet.set_name("Expenses")?;
            write_personal_layout(worksheet, invoice)?;
        } else {
            worksheet.set_name("Invoice")?;
            write_business_layout(worksheet, invoice)?;
        }
    }
    workbook.save_to_buffer()
}

fn business_columns(invoice: &Invoice) -> Vec<Column> {
    let has_hsn = invoice
        .items
        .iter()
        .any(|item| !clean(&item.hsn_sac).is_empty());
    let has_discount = invoice
        .items
        .iter()
        .any(|item| item.discount_amount.unwrap_or(0.0) > 0.0);

    let mut columns = vec![
        Column {
            title: "S.N.",
            width: 6.0,
            field: ItemField::Sn,
        },
        Column {
            title: "Particulars",
            width: 40.0,
            field: ItemField::Particulars,
        },
    ];
    if has_hsn {
        columns.push(Column {
            title: "HSN/SAC",
            width: 12.0,
            field: ItemField::Hsn,
        });
    }
    columns.push(Column {
        title: "Qty",
        width: 10.0,
        field: ItemField::Quantity,
    });
    columns.push(Column {
        title: "Rate",
        width: 12.0,
        field: ItemField::Rate,
    });
    if has_discount {
        columns.push(Column {
            title: "Gross Amt",
            width: 15.0,
            field: ItemField::Gross,
        });
        columns.push(Column {
            title: "Discount",
            width: 12.0,
            field: ItemField::Discount,
        });
    }
    columns.push(Column {
        title: "Tax %",
        width: 10.0,
        field: ItemField::TaxRate,
    });
    columns.push(Column {
        title: "Amount (Inc. Tax)",
        width: 18.0,
        field: ItemField::Amount,
    });
    columns
}

fn write_business_layout(worksheet: &mut Worksheet, invoice: &Invoice) -> Result<(), XlsxError> {
    let columns = business_columns(invoice);
    let last_col = (columns.len() - 1) as u16;

    for (i, column) in columns.iter().enumerate() {
        worksheet.set_column_width(i as u16, column.width)?;
    }

    let title_format = Format::new()
        .set_bold()
        .set_font_size(22)
        .set_align(FormatAlign::Center)
        .set_background_color(Color::RGB(0xFFCC99));
    let header_value = |key: &str| {
        invoice
            .header
            .get(key)
            .map(clean)
            .unwrap_or_default()
    };
    let title = {
        let name = header_value("company_name");
        if name.is_empty() {
            "INVOICE".to_string()
        } else {
            name
        }
    };
    worksheet.merge_range(0, 0, 0, last_col, &title, &title_format)?;

    let mut subtext = header_value("company_subtext");
    let gstin = header_value("gstin");
    if !gstin.is_empty() {
        subtext = format!("{} | GSTIN: {}", subtext, gstin);
    }
    let subtext_format = Format::new().set_align(FormatAlign::Center);
    worksheet.merge_range(1, 0, 1, last_col, &subtext, &subtext_format)?;

    // Small metadata block above the table
    let buyer = header_value("buyer_name");
    if !buyer.is_empty() {
        worksheet.write_string(2, 0, format!("Buyer: {}", buyer))?;
    }
    let date = header_value("date");
    if !date.is_empty() {
        worksheet.write_string(2, last_col, format!("Date: {}", date))?;
    }
    let invoice_no = header_value("invoice_no");
    if !invoice_no.is_empty() {
        worksheet.write_string(3, 0, format!("Invoice No: {}", invoice_no))?;
    }

    let header_format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_text_wrap()
        .set_border(FormatBorder::Medium);
    let header_row: u32 = 4;
    for (i, column) in columns.iter().enumerate() {
        worksheet.write_string_with_format(header_row, i as u16, column.title, &header_format)?;
    }

    let text_cell = Format::new().set_border(FormatBorder::Medium);
    let qty_cell = Format::new().set_border(FormatBorder::Medium);
    let money_cell = Format::new()
        .set_border(FormatBorder::Medium)
        .set_num_format(MONEY_FORMAT);

    let mut row = header_row + 1;
    for item in &invoice.items {
        for (i, column) in columns.iter().enumerate() {
            write_item_cell(
                worksheet,
                row,
                i as u16,
                item,
                &column.field,
                &text_cell,
                &qty_cell,
                &money_cell,
            )?;
        }
        row += 1;
    }

    let total_label = Format::new().set_align(FormatAlign::Right);
    let total_value = Format::new().set_bold().set_num_format(MONEY_FORMAT);
    worksheet.merge_range(row, 0, row, last_col - 1, "Total Amount (Inc. GST)", &total_label)?;
    write_loose_number(
        worksheet,
        row,
        last_col,
        &invoice.footer.total_amount,
        &total_value,
    )?;

    Ok(())
}

fn personal_columns(invoice: &Invoice) -> Vec<Column> {
    let has_qty = invoice
        .items
        .iter()
        .any(|item| item.quantity.as_f64().unwrap_or(0.0) != 0.0);
    let has_discount = invoice
        .items
        .iter()
        .any(|item| item.discount_amount.unwrap_or(0.0) > 0.0);

    let mut columns = vec![Column {
        title: "Description",
        width: 40.0,
        field: ItemField::Particulars,
    }];
    if has_qty {
        columns.push(Column {
            title: "Quantity",
            width: 10.0,
            field: ItemField::Quantity,
        });
        columns.push(Column {
            title: "Rate",
            width: 10.0,
            field: ItemField::Rate,
        });
        if has_discount {
            columns.push(Column {
                title: "Gross Amt",
                width: 15.0,
                field: ItemField::Gross,
            });
            columns.push(Column {
                title: "Discount",
                width: 12.0,
                field: ItemField::Discount,
            });
            columns.push(Column {
                title: "Net Amount",
                width: 18.0,
                field: ItemField::Amount,
            });
        } else {
            columns.push(Column {
                title: "Amount",
                width: 18.0,
                field: ItemField::Amount,
            });
        }
    } else {
        columns.push(Column {
            title: "Amount",
            width: 20.0,
            field: ItemField::Amount,
        });
    }
    columns
}

fn write_personal_layout(worksheet: &mut Worksheet, invoice: &Invoice) -> Result<(), XlsxError> {
    let columns = personal_columns(invoice);

    for (i, column) in columns.iter().enumerate() {
        worksheet.set_column_width(i as u16, column.width)?;
    }

    let title_format = Format::new()
        .set_bold()
        .set_font_size(16)
        .set_font_color(Color::RGB(0x444444));
    worksheet.write_string_with_format(0, 0, "EXPENSE SHEET", &title_format)?;

    let header_format = Format::new().set_bold();
    let header_row: u32 = 3;
    for (i, column) in columns.iter().enumerate() {
        worksheet.write_string_with_format(header_row, i as u16, column.title, &header_format)?;
    }

    let plain = Format::new();
    let money = Format::new().set_num_format(MONEY_FORMAT);
    let mut row = header_row + 1;
    for item in &invoice.items {
        for (i, column) in columns.iter().enumerate() {
            write_item_cell(worksheet, row, i as u16, item, &column.field, &plain, &plain, &money)?;
        }
        row += 1;
    }

    let bold = Format::new().set_bold();
    let bold_money = Format::new().set_bold().set_num_format(MONEY_FORMAT);
    let last_col = (columns.len() - 1) as u16;
    let total_row = row + 1;
    if last_col > 0 {
        worksheet.write_string_with_format(total_row, last_col - 1, "TOTAL", &bold)?;
    }
    write_loose_number(
        worksheet,
        total_row,
        last_col,
        &invoice.footer.total_amount,
        &bold_money,
    )?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write_item_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    item: &LineItem,
    field: &ItemField,
    text_format: &Format,
    qty_format: &Format,
    money_format: &Format,
) -> Result<(), XlsxError> {
    match field {
        ItemField::Sn => {
            worksheet.write_string_with_format(row, col, clean(&item.sn), text_format)?;
        }
        ItemField::Particulars => {
            worksheet.write_string_with_format(row, col, clean(&item.particulars), text_format)?;
        }
        ItemField::Hsn => {
            worksheet.write_string_with_format(row, col, clean(&item.hsn_sac), text_format)?;
        }
        ItemField::TaxRate => {
            worksheet.write_string_with_format(row, col, clean(&item.tax_rate), text_format)?;
        }
        ItemField::Quantity => {
            write_loose_number(worksheet, row, col, &item.quantity, qty_format)?;
        }
        ItemField::Rate => {
            write_loose_number(worksheet, row, col, &item.rate, money_format)?;
        }
        ItemField::Amount => {
            write_loose_number(worksheet, row, col, &item.amount, money_format)?;
        }
        ItemField::Gross => {
            worksheet.write_number_with_format(
                row,
                col,
                item.gross_amount.unwrap_or(0.0),
                money_format,
            )?;
        }
        ItemField::Discount => {
            worksheet.write_number_with_format(
                row,
                col,
                item.discount_amount.unwrap_or(0.0),
                money_format,
            )?;
        }
    }
    Ok(())
}

/// Numeric cells stay numeric; anything else is written as cleaned text.
fn write_loose_number(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    format: &Format,
) -> Result<(), XlsxError> {
    match value.as_f64() {
        Some(n) => worksheet.write_number_with_format(row, col, n, format)?,
        None => worksheet.write_string_with_format(row, col, clean(value), format)?,
    };
    Ok(())
}

/// Display form of a loose field: placeholder junk the model likes to emit
/// ("null", "N/A", empty containers) renders as blank.
fn clean(value: &Value) -> String {
    let text = match value {
        Value::Null => return String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    if matches!(
        text.to_lowercase().as_str(),
        "null" | "none" | "n/a" | "" | "[]" | "{}"
    ) {
        String::new()
    } else {
        text
    }
}
