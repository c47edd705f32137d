use crate::core::{normalize_term, SpecialtyTaxonomy};
use crate::models::domain::floor_count;
use crate::models::{PriceRange, SurgeonRecord, SurgeonStatus};
use crate::services::ports::{DirectoryError, SurgeonDirectory};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Safety stop for the offset-based pagination loop
const MAX_PAGES: usize = 50;
const PAGE_SIZE: usize = 100;

/// Airtable-backed surgeon directory
///
/// Reads the `Surgeons` table through the Airtable REST API, keeping only
/// active surgeons whose specialties mention the procedure or one of the
/// taxonomy categories covering it. Location is not filtered here.
pub struct AirtableDirectory {
    base_url: String,
    api_key: String,
    base_id: String,
    table: String,
    taxonomy: SpecialtyTaxonomy,
    client: Client,
}

/// A single page of records from the Airtable list endpoint
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<Value>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AirtableRecord {
    id: String,
    #[serde(default)]
    fields: SurgeonFields,
}

#[derive(Debug, Default, Deserialize)]
struct SurgeonFields {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Email")]
    email: Option<String>,
    #[serde(rename = "Phone")]
    phone: Option<String>,
    #[serde(rename = "Website")]
    website: Option<String>,
    #[serde(rename = "Specialties")]
    specialties: Option<Specialties>,
    #[serde(rename = "Location")]
    location: Option<String>,
    #[serde(rename = "PriceRange")]
    price_range: Option<String>,
    #[serde(rename = "PriceMin")]
    price_min: Option<f64>,
    #[serde(rename = "PriceMax")]
    price_max: Option<f64>,
    #[serde(rename = "RealSelfRating", alias = "Rating")]
    rating: Option<f64>,
    #[serde(rename = "ReviewCount")]
    review_count: Option<f64>,
    #[serde(rename = "Status")]
    status: Option<String>,
}

/// Specialties arrive as a multi-select list or as a comma separated text field
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Specialties {
    List(Vec<String>),
    Text(String),
}

impl Specialties {
    fn into_set(self) -> std::collections::BTreeSet<String> {
        let items = match self {
            Specialties::List(items) => items,
            Specialties::Text(text) => text.split(',').map(str::to_string).collect(),
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl AirtableRecord {
    fn into_surgeon(self) -> SurgeonRecord {
        let fields = self.fields;

        let price_range = match (fields.price_min, fields.price_max) {
            (Some(min), Some(max)) => Some(PriceRange::new(min, max)),
            (Some(v), None) | (None, Some(v)) => Some(PriceRange::new(v, v)),
            (None, None) => fields.price_range.as_deref().and_then(parse_price_range),
        }
        // Unknown pricing is never penalized against a budget
        .unwrap_or(PriceRange::new(0.0, f64::MAX))
        .normalized();

        let status = match fields.status.as_deref().map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("active") => SurgeonStatus::Active,
            _ => SurgeonStatus::Inactive,
        };

        SurgeonRecord {
            id: self.id,
            specialties: fields.specialties.map(Specialties::into_set).unwrap_or_default(),
            location: fields.location.unwrap_or_default().trim().to_string(),
            price_range,
            rating: fields.rating.unwrap_or(0.0),
            review_count: floor_count(fields.review_count.unwrap_or(0.0)),
            status,
            name: fields.name,
            email: fields.email,
            phone: fields.phone,
            website: fields.website,
        }
    }
}

/// Parse free-text price ranges such as "$5,000 - $8,000", "8000" or "$6k-$9k"
pub fn parse_price_range(text: &str) -> Option<PriceRange> {
    let mut numbers = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() || (c == '.' && !current.is_empty()) {
            current.push(c);
            continue;
        }
        if c == ',' && !current.is_empty() && chars.peek().is_some_and(|n| n.is_ascii_digit()) {
            continue;
        }
        if !current.is_empty() {
            let multiplier = if c.eq_ignore_ascii_case(&'k') { 1000.0 } else { 1.0 };
            if let Ok(value) = current.parse::<f64>() {
                numbers.push(value * multiplier);
            }
            current.clear();
        }
    }
    if let Ok(value) = current.parse::<f64>() {
        numbers.push(value);
    }

    match numbers.as_slice() {
        [] => None,
        [single] => Some(PriceRange::new(*single, *single)),
        [min, max, ..] => Some(PriceRange::new(*min, *max)),
    }
}

/// Escape a value for use inside a single-quoted Airtable formula string
fn escape_formula(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn specialty_clause(term: &str) -> String {
    format!(
        "FIND(LOWER('{}'), LOWER(ARRAYJOIN({{Specialties}})))",
        escape_formula(term.trim())
    )
}

/// Formula selecting active surgeons whose specialties mention the procedure
/// or any of the given categories
pub fn candidate_formula(procedure: &str, categories: &[&str]) -> String {
    let mut clauses = vec![specialty_clause(procedure)];
    clauses.extend(categories.iter().map(|category| specialty_clause(category)));

    let specialties = if clauses.len() == 1 {
        clauses.remove(0)
    } else {
        format!("OR({})", clauses.join(", "))
    };

    format!("AND({{Status}} = 'Active', {})", specialties)
}

impl AirtableDirectory {
    /// Create a new Airtable directory client
    pub fn new(
        base_url: String,
        api_key: String,
        base_id: String,
        table: String,
        timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            base_id,
            table,
            taxonomy: SpecialtyTaxonomy::default(),
            client,
        })
    }

    /// Also fetch surgeons listing only a category that covers the procedure
    pub fn with_taxonomy(mut self, taxonomy: SpecialtyTaxonomy) -> Self {
        self.taxonomy = taxonomy;
        self
    }

    fn list_url(&self, formula: &str, offset: Option<&str>) -> String {
        let mut url = format!(
            "{}/{}/{}?pageSize={}&filterByFormula={}",
            self.base_url.trim_end_matches('/'),
            self.base_id,
            urlencoding::encode(&self.table),
            PAGE_SIZE,
            urlencoding::encode(formula)
        );
        if let Some(offset) = offset {
            url.push_str("&offset=");
            url.push_str(&urlencoding::encode(offset));
        }
        url
    }

    async fn fetch_page(&self, url: &str) -> Result<ListResponse, DirectoryError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DirectoryError::Unauthorized);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Airtable list failed: {} - {}", status, body);
            return Err(DirectoryError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json::<ListResponse>()
            .await
            .map_err(|e| DirectoryError::InvalidResponse(format!("Failed to parse records: {}", e)))
    }
}

#[async_trait]
impl SurgeonDirectory for AirtableDirectory {
    async fn candidates(&self, procedure: &str) -> Result<Vec<SurgeonRecord>, DirectoryError> {
        let normalized = normalize_term(procedure);
        let categories: Vec<&str> = self.taxonomy.categories_for(&normalized).collect();
        let formula = candidate_formula(procedure, &categories);
        let mut surgeons = Vec::new();
        let mut offset: Option<String> = None;

        for page in 0..MAX_PAGES {
            let url = self.list_url(&formula, offset.as_deref());
            tracing::debug!("Fetching surgeons page {} from: {}", page, url);

            let response = self.fetch_page(&url).await?;

            for raw in response.records {
                match serde_json::from_value::<AirtableRecord>(raw) {
                    Ok(record) => surgeons.push(record.into_surgeon()),
                    Err(e) => tracing::warn!("Skipping malformed surgeon record: {}", e),
                }
            }

            match response.offset {
                Some(next) => offset = Some(next),
                None => {
                    tracing::debug!("Fetched {} surgeons for '{}'", surgeons.len(), procedure);
                    return Ok(surgeons);
                }
            }
        }

        tracing::warn!(
            "Stopped paging surgeons for '{}' after {} pages ({} records)",
            procedure,
            MAX_PAGES,
            surgeons.len()
        );
        Ok(surgeons)
    }
}
