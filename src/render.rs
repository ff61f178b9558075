//! Markdown rendering and persistence of a [`Report`].
//!
//! Labels are Portuguese: the collaborator application's report page
//! scrapes the `Total de Requests`, `Taxa de Sucesso`, `Média` and
//! `Tempo de Resposta Médio` lines, so their wording must not change.

use crate::analysis::{Grade, Report, SuccessGrade};
use crate::config::ReportKind;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::fmt::{self, Write as _};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Collision suffixes tried before giving up on a file name.
const MAX_SUFFIX: u32 = 1000;

/// Render `report` as markdown. Same report, same text.
pub fn render(report: &Report) -> String {
    Markdown(report).to_string()
}

/// `stress_test_report_20260314_100000.md` or `advanced_stress_report_...`.
pub fn file_name(kind: ReportKind, generated_at: DateTime<Utc>) -> String {
    format!(
        "{}_{}.md",
        kind.file_prefix(),
        generated_at.format("%Y%m%d_%H%M%S")
    )
}

/// Write the rendered report into `dir`, never overwriting an existing file.
///
/// A taken name gets `_1`, `_2`, ... appended before the extension.
pub fn write_report(dir: &Path, report: &Report) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let text = render(report);
    let base = file_name(report.kind, report.generated_at);
    let stem = base.trim_end_matches(".md");

    for attempt in 0..MAX_SUFFIX {
        let name = if attempt == 0 {
            base.clone()
        } else {
            format!("{}_{}.md", stem, attempt)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                fill(&path, file, &text)?;
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free report name for {} in {}", base, dir.display()),
    )
    .into())
}

/// Write `text` to a freshly created file, removing it again if the write fails.
fn fill<W: io::Write>(path: &Path, mut out: W, text: &str) -> io::Result<()> {
    let written = out.write_all(text.as_bytes()).and_then(|_| out.flush());
    if written.is_err() {
        drop(out);
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove partial report");
        }
    }
    written
}

struct Markdown<'a>(&'a Report);

impl fmt::Display for Markdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        match self.0.kind {
            ReportKind::Basic => basic(&mut out, self.0)?,
            ReportKind::Advanced => advanced(&mut out, self.0)?,
        }
        f.write_str(&out)
    }
}

// =============================================================================
// Basic layout
// =============================================================================

fn basic(out: &mut String, r: &Report) -> fmt::Result {
    writeln!(out, "# Relatório de Teste de Estresse - GestokPro")?;
    writeln!(out)?;
    writeln!(out, "**Data/Hora:** {}  ", human_time(r.generated_at))?;
    writeln!(out, "**URL Testada:** {}  ", r.base_url)?;
    writeln!(out, "**Duração do Teste:** {}", clock(r.span))?;
    writeln!(out)?;

    writeln!(out, "## 📊 Resumo Geral")?;
    writeln!(out)?;
    writeln!(out, "- **Total de Requests:** {}", r.total)?;
    writeln!(
        out,
        "- **Requests Bem-sucedidos:** {} ({:.1}%)",
        r.successes, r.success_rate
    )?;
    writeln!(
        out,
        "- **Requests com Falha:** {} ({:.1}%)",
        r.failures,
        100.0 - r.success_rate
    )?;
    writeln!(out, "- **Taxa de Sucesso:** {:.1}%", r.success_rate)?;
    writeln!(out)?;

    writeln!(out, "## ⚡ Métricas de Performance")?;
    writeln!(out)?;
    writeln!(out, "### Tempo de Resposta (ms)")?;
    writeln!(out, "- **Média:** {:.2} ms", r.latency.mean)?;
    writeln!(out, "- **Mediana:** {:.2} ms", r.latency.median)?;
    writeln!(out, "- **Mínimo:** {:.2} ms", r.latency.min)?;
    writeln!(out, "- **Máximo:** {:.2} ms", r.latency.max)?;
    writeln!(out, "- **Desvio Padrão:** {:.2} ms", r.latency.std_dev)?;
    writeln!(out)?;
    writeln!(out, "### Percentis")?;
    for p in &r.percentiles {
        writeln!(out, "- **{}:** {:.2} ms", p.label(), p.latency_ms)?;
    }
    writeln!(out)?;

    writeln!(out, "## 🎯 Performance por Endpoint")?;
    writeln!(out)?;
    for e in &r.endpoints {
        writeln!(out, "### {}", e.endpoint)?;
        writeln!(out, "- **Total de Requests:** {}", e.count)?;
        writeln!(out, "- **Taxa de Sucesso:** {:.1}%", e.success_rate)?;
        writeln!(out, "- **Tempo Médio de Resposta:** {:.2} ms", e.mean_ms)?;
        writeln!(out, "- **Tempo Mínimo:** {:.2} ms", e.min_ms)?;
        writeln!(out, "- **Tempo Máximo:** {:.2} ms", e.max_ms)?;
        writeln!(out)?;
    }

    writeln!(out, "## 🔍 Análise e Recomendações")?;
    writeln!(out)?;
    writeln!(out, "### Performance Geral")?;
    writeln!(
        out,
        "{} **{}**: {}",
        grade_icon(r.grade),
        r.grade.label(),
        r.grade.description()
    )?;
    writeln!(out, "{}", success_line(r.success_grade))?;

    if !r.slow_endpoints.is_empty() {
        writeln!(out)?;
        writeln!(out, "### Endpoints que Precisam de Otimização")?;
        for e in &r.slow_endpoints {
            writeln!(out, "- **{}**: {:.2} ms médio", e.endpoint, e.mean_ms)?;
        }
    }
    writeln!(out)?;

    writeln!(out, "## 📋 Dados Detalhados")?;
    writeln!(out)?;
    writeln!(out, "### Últimos {} Requests", r.recent.len())?;
    for s in &r.recent {
        writeln!(
            out,
            "- {} {} {} - {:.2}ms ({})",
            if s.success { "✅" } else { "❌" },
            s.method,
            s.endpoint,
            s.latency_ms,
            s.status_code
        )?;
    }
    writeln!(out)?;
    writeln!(out, "---")?;
    writeln!(
        out,
        "*Relatório gerado automaticamente pelo Sistema de Teste de Estresse do GestokPro*"
    )
}

// =============================================================================
// Advanced layout
// =============================================================================

fn advanced(out: &mut String, r: &Report) -> fmt::Result {
    writeln!(out, "# Relatório Avançado de Teste de Estresse - GestokPro")?;
    writeln!(out)?;
    writeln!(out, "**Data/Hora:** {}  ", human_time(r.generated_at))?;
    writeln!(out, "**URL Testada:** {}  ", r.base_url)?;
    writeln!(out, "**Duração do Teste:** {}", clock(r.span))?;
    writeln!(out)?;

    writeln!(out, "## 📊 Resumo Executivo")?;
    writeln!(out)?;
    writeln!(out, "### Indicadores Chave de Performance (KPIs)")?;
    writeln!(out, "- **Total de Requests:** {}", r.total)?;
    writeln!(out, "- **Taxa de Sucesso:** {:.1}%", r.success_rate)?;
    writeln!(out, "- **Tempo de Resposta Médio:** {:.2} ms", r.latency.mean)?;
    match r.requests_per_minute {
        Some(rate) => writeln!(out, "- **Throughput Médio:** {:.1} req/min", rate)?,
        None => writeln!(out, "- **Throughput Médio:** n/d")?,
    }
    writeln!(out)?;
    writeln!(out, "### Classificação de Performance")?;
    writeln!(
        out,
        "**Status:** {} {}  ",
        grade_icon(r.grade),
        r.grade.label()
    )?;
    writeln!(out, "**Avaliação:** {}", r.grade.description())?;
    writeln!(out)?;

    writeln!(out, "## 📈 Análise de Percentis de Latência")?;
    writeln!(out)?;
    writeln!(out, "| Percentil | Tempo de Resposta |")?;
    writeln!(out, "|-----------|-------------------|")?;
    for p in &r.percentiles {
        writeln!(out, "| {} | {:.2} ms |", p.label(), p.latency_ms)?;
    }
    writeln!(out)?;

    writeln!(out, "## ⚡ Análise de Throughput")?;
    writeln!(out)?;
    writeln!(out, "| Horário | Req/min | Tempo Médio | Tempo Máximo |")?;
    writeln!(out, "|---------|---------|-------------|--------------|")?;
    for b in &r.throughput {
        writeln!(
            out,
            "| {} | {} | {:.1} ms | {:.1} ms |",
            b.minute.format("%H:%M"),
            b.requests,
            b.mean_ms,
            b.max_ms
        )?;
    }

    if !r.anomalies.is_empty() {
        writeln!(out)?;
        writeln!(out, "## 🚨 Detecção de Anomalias")?;
        writeln!(out)?;
        writeln!(
            out,
            "Foram detectados **{}** requests com tempo de resposta anômalo (>{:.1} ms):",
            r.anomalies.len(),
            r.anomaly_threshold_ms
        )?;
        writeln!(out)?;
        for a in r.recent_anomalies() {
            writeln!(
                out,
                "- {} - {:.1} ms ({})",
                a.endpoint,
                a.latency_ms,
                a.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ")
            )?;
        }
    }
    writeln!(out)?;

    writeln!(out, "## 🔍 Análise de Padrões de Uso")?;
    writeln!(out)?;
    writeln!(out, "### Endpoints Mais Acessados")?;
    for (endpoint, count) in &r.top_endpoints {
        writeln!(
            out,
            "- **{}**: {} requests ({:.1}%)",
            endpoint,
            count,
            share(*count, r.total)
        )?;
    }
    writeln!(out)?;

    writeln!(out, "## 💡 Recomendações de Otimização")?;
    writeln!(out)?;
    recommendations(out, r)?;

    writeln!(out, "## 📊 Dados Técnicos Detalhados")?;
    writeln!(out)?;
    writeln!(out, "### Distribuição de Status Codes")?;
    for (code, count) in &r.status_codes {
        writeln!(
            out,
            "- **{}**: {} requests ({:.1}%)",
            code,
            count,
            share(*count, r.total)
        )?;
    }
    writeln!(out)?;
    writeln!(out, "### Métricas de Confiabilidade")?;
    writeln!(
        out,
        "- **MTTR (Mean Time To Respond)**: {:.2} ms",
        r.latency.mean
    )?;
    writeln!(out, "- **Desvio Padrão**: {:.2} ms", r.latency.std_dev)?;
    writeln!(
        out,
        "- **Coeficiente de Variação**: {:.1}%",
        r.latency.coefficient_of_variation()
    )?;
    writeln!(out, "- **Requests com Erro**: {}", r.failures)?;
    writeln!(out, "- **Uptime**: {:.2}%", r.success_rate)?;
    writeln!(out)?;
    writeln!(out, "---")?;
    writeln!(
        out,
        "*Relatório gerado automaticamente pelo Sistema Avançado de Teste de Estresse*"
    )
}

fn recommendations(out: &mut String, r: &Report) -> fmt::Result {
    let mut any = false;

    if r.grade == Grade::TotalFailure {
        any = true;
        writeln!(out, "### ⛔ Disponibilidade")?;
        writeln!(out, "- Verificar se a aplicação está no ar e acessível")?;
        writeln!(out, "- Conferir credenciais e fluxo de login")?;
        writeln!(out)?;
    } else if r.latency.mean > 1000.0 {
        any = true;
        writeln!(out, "### 🔴 Ações Críticas")?;
        writeln!(out, "- Implementar cache de consultas ao banco de dados")?;
        writeln!(out, "- Otimizar queries SQL mais lentas")?;
        writeln!(out, "- Considerar implementar paginação mais eficiente")?;
        writeln!(out, "- Revisar índices do banco de dados")?;
        writeln!(out)?;
    }

    if r.is_unstable() {
        any = true;
        writeln!(out, "### 🟠 Estabilidade")?;
        writeln!(out, "- Investigar picos de latência")?;
        writeln!(out, "- Implementar circuit breakers")?;
        writeln!(out, "- Configurar alertas de performance")?;
        writeln!(out)?;
    }

    if !r.slow_endpoints.is_empty() {
        any = true;
        writeln!(out, "### 🔧 Endpoints para Otimização")?;
        for e in &r.slow_endpoints {
            writeln!(out, "- **{}**: {:.1} ms médio", e.endpoint, e.mean_ms)?;
        }
        writeln!(out)?;
    }

    if !any {
        writeln!(out, "Nenhuma ação necessária.")?;
        writeln!(out)?;
    }
    Ok(())
}

fn grade_icon(grade: Grade) -> &'static str {
    match grade {
        Grade::Excellent => "🟢",
        Grade::Good => "🟡",
        Grade::Degraded => "🟠",
        Grade::Critical => "🔴",
        Grade::TotalFailure => "⛔",
    }
}

fn success_line(grade: SuccessGrade) -> &'static str {
    match grade {
        SuccessGrade::Excellent => "✅ **Excelente**: Taxa de sucesso acima de 99%",
        SuccessGrade::Good => "🟡 **Bom**: Taxa de sucesso entre 95-99%",
        SuccessGrade::Critical => {
            "🔴 **Crítico**: Taxa de sucesso abaixo de 95% - investigação necessária"
        }
    }
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

fn human_time(t: DateTime<Utc>) -> String {
    t.format("%d/%m/%Y às %H:%M:%S UTC").to_string()
}

/// `H:MM:SS`.
fn clock(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}
