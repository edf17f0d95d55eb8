//! 工资条 PDF
//!
//! 生成单页 PDF，只用内置 Helvetica 字体，不依赖外部库。
//! 文件写到 `{UPLOAD_DIR}/payroll/`，返回相对路径存入工资单记录。

use std::fmt::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::models::{Payroll, User};

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("document io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    /// 生成工资条，返回存储路径
    async fn generate_salary_slip(
        &self,
        payroll: &Payroll,
        employee: &User,
    ) -> Result<String, DocumentError>;

    /// 读取已生成的文档，不存在时返回 None
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, DocumentError>;
}

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub fn month_name(month: i32) -> &'static str {
    usize::try_from(month - 1)
        .ok()
        .and_then(|i| MONTH_NAMES.get(i))
        .copied()
        .unwrap_or("")
}

/// 下载时的文件名，优先使用工号
pub fn slip_file_name(payroll: &Payroll, employee_code: Option<&str>) -> String {
    let who = employee_code
        .map(str::to_string)
        .unwrap_or_else(|| payroll.employee_id.to_string());
    format!("salary-{}-{}-{:02}.pdf", who, payroll.year, payroll.month)
}

fn money(currency: &str, amount: f64) -> String {
    format!("{currency} {amount:.2}")
}

/// 工资条的文本行
pub fn slip_lines(payroll: &Payroll, employee: &User) -> Vec<String> {
    let currency = payroll.currency.as_str();
    let mut lines = vec![
        format!(
            "Employee: {} ({})",
            employee.name,
            employee.employee_code.as_deref().unwrap_or("N/A")
        ),
        format!("Period: {} {}", month_name(payroll.month), payroll.year),
        String::new(),
        format!("Basic Salary: {}", money(currency, payroll.basic_salary)),
    ];
    lines.extend(
        payroll
            .allowances
            .iter()
            .map(|(name, amount)| format!("{name}: {}", money(currency, *amount))),
    );
    lines.push(format!("Gross: {}", money(currency, payroll.gross_salary)));
    lines.push(String::new());
    lines.extend(
        payroll
            .deductions
            .iter()
            .map(|(name, amount)| format!("{name}: -{}", money(currency, *amount))),
    );
    lines.push(String::new());
    lines.push(format!("Net Salary: {}", money(currency, payroll.net_salary)));
    lines.push(String::new());
    lines.push("This is a system-generated document.".to_string());
    lines
}

/// PDF 字符串转义，非 ASCII 字符替换为 `?`
fn pdf_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// 渲染单页 A4 PDF
pub fn render_pdf(title: &str, lines: &[String]) -> Vec<u8> {
    let mut content = String::new();
    let _ = writeln!(content, "BT\n/F1 20 Tf\n50 780 Td\n({}) Tj", pdf_text(title));
    content.push_str("/F1 10 Tf\n14 TL\n0 -16 Td\n");
    for line in lines {
        let _ = writeln!(content, "T* ({}) Tj", pdf_text(line));
    }
    content.push_str("ET\n");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] \
         /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}endstream",
            content.len(),
            content
        ),
    ];

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        let _ = write!(out, "{} 0 obj\n{}\nendobj\n", i + 1, body);
    }

    let xref_at = out.len();
    let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = write!(out, "{offset:010} 00000 n \n");
    }
    let _ = write!(
        out,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    );
    out.into_bytes()
}

/// 写入本地目录的工资条生成器
pub struct PdfSlipGenerator {
    upload_dir: PathBuf,
}

impl PdfSlipGenerator {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }
}

#[async_trait]
impl DocumentGenerator for PdfSlipGenerator {
    async fn generate_salary_slip(
        &self,
        payroll: &Payroll,
        employee: &User,
    ) -> Result<String, DocumentError> {
        let dir = self.upload_dir.join("payroll");
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!(
            "salary-{}-{}-{:02}.pdf",
            payroll.employee_id, payroll.year, payroll.month
        );
        let path = dir.join(&file_name);
        let bytes = render_pdf("Salary Slip", &slip_lines(payroll, employee));
        tokio::fs::write(&path, bytes).await?;

        tracing::info!(payroll_id = %payroll.id, path = %path.display(), "Salary slip generated");
        Ok(path.to_string_lossy().replace('\\', "/"))
    }

    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, DocumentError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
