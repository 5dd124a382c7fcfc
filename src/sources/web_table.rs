//! Extract an HTML table from a web page

use crate::error::{EtlError, Result};
use crate::etl::Extractor;
use crate::table::{Dataset, Record, Schema, Value};
use crate::transform::{strip_citations, strip_thousands};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// Which table to read and how to type its columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// CSS selector; the first match is used
    pub selector: String,
    /// Columns coerced to floats after removing thousands separators
    #[serde(default)]
    pub numeric_columns: Vec<String>,
    /// Replacement names for the expanded header, by position
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

impl TableSpec {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            numeric_columns: Vec::new(),
            columns: None,
        }
    }

    pub fn numeric<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numeric_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn renamed<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Parse the table out of an HTML document.
    ///
    /// Header labels come from the `th` cells of the first row, repeated per
    /// `colspan`. Data rows whose `td` count differs from the header width
    /// are dropped.
    ///
    /// # Errors
    /// - `Extraction` if no element matches the selector
    /// - `Schema` if a numeric column or the rename list does not fit
    /// - `Transform` if a numeric cell is not a number
    pub fn parse(&self, html: &str) -> Result<Dataset> {
        let table_selector = Selector::parse(&self.selector).map_err(|e| {
            EtlError::Config(format!("invalid selector '{}': {}", self.selector, e))
        })?;
        let row_selector = css("tr")?;
        let header_selector = css("th")?;
        let cell_selector = css("td")?;

        let document = Html::parse_document(html);
        let table = document.select(&table_selector).next().ok_or_else(|| {
            EtlError::extraction(format!("no element matches '{}'", self.selector))
        })?;

        let mut rows = table.select(&row_selector);
        let headers = match rows.next() {
            Some(first) => header_labels(first, &header_selector),
            None => Vec::new(),
        };
        if headers.is_empty() {
            return Err(EtlError::extraction(format!(
                "table '{}' has no header row",
                self.selector
            )));
        }

        let schema = match &self.columns {
            Some(names) if names.len() != headers.len() => {
                return Err(EtlError::schema(format!(
                    "{} replacement column names given for {} header columns",
                    names.len(),
                    headers.len()
                )));
            }
            Some(names) => Schema::new(names.iter().cloned()),
            None => Schema::new(headers),
        };

        let numeric = self
            .numeric_columns
            .iter()
            .map(|name| schema.require(name))
            .collect::<Result<Vec<_>>>()?;

        let mut dataset = Dataset::new(schema);
        let mut dropped = 0;
        for row in rows {
            let cells: Vec<String> = row
                .select(&cell_selector)
                .map(|cell| strip_citations(&element_text(cell)))
                .collect();
            if cells.len() != dataset.schema().len() {
                dropped += 1;
                continue;
            }

            let row_index = dataset.len();
            let mut values: Vec<Value> = cells.into_iter().map(Value::Text).collect();
            for &index in &numeric {
                let raw = strip_thousands(values[index].as_str().unwrap_or_default());
                let number = raw.parse::<f64>().ok().filter(|f| f.is_finite()).ok_or_else(|| {
                    EtlError::transform(
                        &dataset.schema().fields()[index],
                        row_index,
                        format!("'{}' is not numeric", raw),
                    )
                })?;
                values[index] = Value::Float(number);
            }
            dataset.push(Record::new(values))?;
        }

        log::debug!(
            "Parsed {} row(s), dropped {} row(s) with a different width",
            dataset.len(),
            dropped
        );
        Ok(dataset)
    }
}

fn css(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| EtlError::Config(format!("invalid selector '{}': {}", selector, e)))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn header_labels(row: ElementRef<'_>, header_selector: &Selector) -> Vec<String> {
    let mut labels = Vec::new();
    for cell in row.select(header_selector) {
        let span = cell
            .value()
            .attr("colspan")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(1);
        let label = strip_citations(&element_text(cell));
        labels.extend(std::iter::repeat_n(label, span));
    }
    labels
}

/// Extractor for one HTML table fetched with HTTP GET
pub struct WebTableExtractor {
    url: Url,
    spec: TableSpec,
    client: Client,
}

impl WebTableExtractor {
    pub fn new(url: Url, spec: TableSpec) -> Self {
        Self::with_client(url, spec, Client::new())
    }

    pub fn with_client(url: Url, spec: TableSpec, client: Client) -> Self {
        Self { url, spec, client }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn fetch(&self) -> Result<String> {
        log::debug!("GET {}", self.url);
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| EtlError::extraction(format!("failed to fetch {}: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::extraction(format!(
                "GET {} returned {}",
                self.url, status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| EtlError::extraction(format!("failed to read {}: {}", self.url, e)))
    }
}

impl Extractor for WebTableExtractor {
    fn describe(&self) -> String {
        format!("table '{}' at {}", self.spec.selector, self.url)
    }

    async fn extract(&self) -> Result<Dataset> {
        let html = self.fetch().await?;
        let dataset = self.spec.parse(&html)?;
        log::info!("Extracted {} row(s) from {}", dataset.len(), self.url);
        Ok(dataset)
    }
}
