// src/services/export_service.rs

use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};

use crate::{
    common::error::AppError,
    models::crm::{Customer, CUSTOMER_COLUMNS},
    services::crm_service::CrmService,
};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Planilha gerada, pronta para download.
#[derive(Debug, Clone)]
pub struct CustomerReport {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub rows: usize,
}

#[derive(Clone)]
pub struct ExportService {
    crm_service: CrmService,
}

impl ExportService {
    pub fn new(crm_service: CrmService) -> Self {
        Self { crm_service }
    }

    /// Exporta TODOS os clientes. Filtros de tela não se aplicam aqui.
    pub async fn export_customers(&self, today: NaiveDate) -> Result<CustomerReport, AppError> {
        let customers = self.crm_service.list_customers().await?;
        let rows = customers.len();

        // Montar o xlsx é CPU puro; sai do executor async
        let bytes = tokio::task::spawn_blocking(move || customers_to_xlsx(&customers))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de exportação: {}", e))??;

        tracing::info!(rows, size = bytes.len(), "📤 Relatório de clientes gerado");

        Ok(CustomerReport {
            file_name: report_file_name(today),
            bytes,
            rows,
        })
    }
}

/// `report_clienti_{YYYYMMDD}.xlsx`
pub fn report_file_name(date: NaiveDate) -> String {
    format!("report_clienti_{}.xlsx", date.format("%Y%m%d"))
}

/// Uma linha de cabeçalho com os campos do schema, uma linha por cliente.
pub fn customers_to_xlsx(customers: &[Customer]) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Customers")?;

    for (col, name) in CUSTOMER_COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &header)?;
    }

    for (idx, customer) in customers.iter().enumerate() {
        let row = idx as u32 + 1;

        worksheet.write_number(row, 0, customer.id as f64)?;
        worksheet.write_string(row, 1, customer.name.as_str())?;
        worksheet.write_string(row, 2, customer.customer_type.label())?;
        worksheet.write_string(row, 3, customer.owner.as_str())?;
        worksheet.write_string(row, 4, customer.stage.label())?;
        worksheet.write_string(row, 5, customer.status.label())?;
        worksheet.write_string(row, 6, customer.email.as_str())?;
        // Campos opcionais vazios ficam como célula em branco
        if let Some(phone) = &customer.phone {
            worksheet.write_string(row, 7, phone.as_str())?;
        }
        if let Some(note) = &customer.note {
            worksheet.write_string(row, 8, note.as_str())?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}
