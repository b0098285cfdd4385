//! Clan list query parsing and filter building
//!
//! Query-string parameters are parsed with defensive defaults (a malformed
//! page never fails the request) and turned into bson filter/sort documents.
//! Sort fields go through a whitelist so callers cannot order by arbitrary
//! document paths.

use bson::{doc, Document};

use crate::db::schemas::{AdmissionPolicy, ClanCategory};

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

/// Which lifecycle states a listing should include
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    Active,
    Archived,
    All,
}

/// Parsed `GET /api/clans` query
#[derive(Debug, Default)]
pub struct ClanQuery {
    pub status: StatusFilter,
    pub search: Option<String>,
    pub clan_type: Option<AdmissionPolicy>,
    pub category: Option<ClanCategory>,
    pub tags: Vec<String>,
    pub city: Option<String>,
    /// Comma-separated sort spec, `-field` = descending
    pub sort: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl ClanQuery {
    /// Parse from a raw query string, defaulting anything malformed
    pub fn from_query_string(query: Option<&str>) -> Self {
        let mut params = Self {
            page: 1,
            limit: DEFAULT_LIMIT,
            ..Self::default()
        };

        if let Some(q) = query {
            for pair in q.split('&') {
                if let Some((key, value)) = pair.split_once('=') {
                    // Form encoding: '+' means space, so it must be replaced
                    // before percent-decoding or an encoded %2B is lost.
                    let value = value.replace('+', " ");
                    let value = urlencoding::decode(&value)
                        .map(|v| v.into_owned())
                        .unwrap_or_default();
                    match key {
                        "page" => params.page = value.parse().unwrap_or(1).max(1),
                        "limit" => {
                            params.limit =
                                value.parse().unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
                        }
                        "search" if !value.is_empty() => params.search = Some(value.to_string()),
                        "status" => {
                            params.status = match value.as_str() {
                                "archived" => StatusFilter::Archived,
                                "all" => StatusFilter::All,
                                _ => StatusFilter::Active,
                            }
                        }
                        "type" => {
                            params.clan_type = match value.as_str() {
                                "open" => Some(AdmissionPolicy::Open),
                                "closed" => Some(AdmissionPolicy::Closed),
                                _ => None,
                            }
                        }
                        "category" => params.category = ClanCategory::parse(&value),
                        "tags" if !value.is_empty() => {
                            params.tags = value
                                .split(',')
                                .map(str::trim)
                                .filter(|t| !t.is_empty())
                                .map(str::to_string)
                                .collect()
                        }
                        "city" if !value.is_empty() => params.city = Some(value.to_string()),
                        "sort" if !value.is_empty() => params.sort = Some(value.to_string()),
                        _ => {}
                    }
                }
            }
        }

        params
    }

    /// Build the Mongo filter for this query
    pub fn to_filter(&self) -> Document {
        let mut filter = doc! { "is_visible": true };

        match self.status {
            StatusFilter::Active => {
                filter.insert("status", "active");
            }
            StatusFilter::Archived => {
                filter.insert("status", "archived");
            }
            StatusFilter::All => {}
        }

        if let Some(ref search) = self.search {
            filter.insert(
                "name",
                doc! { "$regex": escape_regex(search), "$options": "i" },
            );
        }

        if let Some(clan_type) = self.clan_type {
            let label = match clan_type {
                AdmissionPolicy::Open => "open",
                AdmissionPolicy::Closed => "closed",
            };
            filter.insert("clan_type", label);
        }

        if let Some(category) = self.category {
            filter.insert("category", category.as_str());
        }

        if !self.tags.is_empty() {
            filter.insert("tags", doc! { "$in": self.tags.clone() });
        }

        if let Some(ref city) = self.city {
            filter.insert("city", city.clone());
        }

        filter
    }

    /// Build the sort document; unknown fields are dropped, empty spec
    /// falls back to rating descending.
    pub fn to_sort(&self) -> Document {
        let mut sort = Document::new();

        if let Some(ref spec) = self.sort {
            for field in spec.split(',').map(str::trim).filter(|f| !f.is_empty()) {
                let (name, dir) = match field.strip_prefix('-') {
                    Some(rest) => (rest, -1),
                    None => (field, 1),
                };
                if let Some(path) = sort_field_path(name) {
                    sort.insert(path, dir);
                }
            }
        }

        if sort.is_empty() {
            sort.insert("rating", -1);
        }
        sort
    }

    pub fn skip(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * (self.limit as u64)
    }
}

/// Map an API sort field to its document path. Whitelist only.
fn sort_field_path(name: &str) -> Option<&'static str> {
    match name {
        "rating" => Some("rating"),
        "memberCount" => Some("member_count"),
        "name" => Some("name"),
        "createdAt" => Some("metadata.created_at"),
        _ => None,
    }
}

/// Escape regex metacharacters so a search term matches literally
fn escape_regex(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if ".^$*+?()[]{}|\\".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
