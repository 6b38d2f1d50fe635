//! Query string construction
//!
//! Pagination, sorting, field selection and server-side filters share one
//! encoding. Empty values are dropped, and an empty parameter set produces
//! no `?` at all.

/// Encode `pairs` as `?k=v&k=v`, or an empty string when there are none.
///
/// Every pair is emitted as given, including empty values.
pub fn build_query<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }

    let query_parts: Vec<String> = pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                urlencoding::encode(k.as_ref()),
                urlencoding::encode(v.as_ref())
            )
        })
        .collect();

    format!("?{}", query_parts.join("&"))
}

/// Append encoded pairs to a URL that may already carry a query string
pub fn append_query<K: AsRef<str>, V: AsRef<str>>(url: &str, pairs: &[(K, V)]) -> String {
    let query = build_query(pairs);
    if query.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, &query[1..])
    } else {
        format!("{}{}", url, query)
    }
}

/// Append `namespace=` only when a namespace is set
pub fn with_namespace(url: &str, namespace: &str) -> String {
    if namespace.is_empty() {
        url.to_string()
    } else {
        append_query(url, &[("namespace", namespace)])
    }
}

/// Parameters accepted by every `list` operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    /// Opaque pagination cursor
    pub marker: Option<String>,
    /// Page size; omitted when not positive
    pub limit: Option<i64>,
    pub sort_keys: Vec<String>,
    pub sort_dirs: Vec<String>,
    /// Restrict the returned fields
    pub fields: Vec<String>,
    /// Server-side `name=value` filters
    pub filters: Vec<(String, String)>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort_keys<I: IntoIterator<Item = S>, S: Into<String>>(mut self, keys: I) -> Self {
        self.sort_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn sort_dirs<I: IntoIterator<Item = S>, S: Into<String>>(mut self, dirs: I) -> Self {
        self.sort_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn fields<I: IntoIterator<Item = S>, S: Into<String>>(mut self, fields: I) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((name.into(), value.into()));
        self
    }

    /// Non-empty parameters in wire order, followed by non-empty `extras`
    pub fn to_pairs(&self, extras: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if let Some(marker) = self.marker.as_deref().filter(|m| !m.is_empty()) {
            pairs.push(("marker".to_string(), marker.to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            pairs.push(("limit".to_string(), limit.to_string()));
        }

        let joined = [
            ("sort_keys", &self.sort_keys),
            ("sort_dirs", &self.sort_dirs),
            ("fields", &self.fields),
        ];
        for (name, values) in joined {
            let values: Vec<&str> = values
                .iter()
                .map(String::as_str)
                .filter(|v| !v.is_empty())
                .collect();
            if !values.is_empty() {
                pairs.push((name.to_string(), values.join(",")));
            }
        }

        for (name, value) in extras {
            if !value.is_empty() {
                pairs.push((name.to_string(), value.to_string()));
            }
        }

        for (name, value) in &self.filters {
            if !value.is_empty() {
                pairs.push((name.clone(), value.clone()));
            }
        }

        pairs
    }

    /// Query string for these parameters plus resource-specific `extras`
    pub fn query_string(&self, extras: &[(&str, &str)]) -> String {
        build_query(&self.to_pairs(extras))
    }
}
