use crate::config::ServiceTarget;

#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub prefix: String,
    pub target: String,
    pub service_name: String,
}

impl RouteEntry {
    /// Removes the route prefix from `path` exactly once. A path equal to the
    /// prefix maps to `/` so backends always see a rooted path.
    pub fn strip_path<'a>(&self, path: &'a str) -> &'a str {
        let rest = path.strip_prefix(&self.prefix).unwrap_or(path);
        if rest.is_empty() {
            "/"
        } else {
            rest
        }
    }
}

/// Prefix routing table built from the configured service targets.
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(services: &[ServiceTarget]) -> Self {
        let entries = services
            .iter()
            .map(|service| RouteEntry {
                prefix: service.route.clone(),
                target: service.target.clone(),
                service_name: service.name.clone(),
            })
            .collect();

        Self { entries }
    }

    /// Finds the most specific route for `path`.
    ///
    /// A prefix only matches on a segment boundary: `/api/auth` matches
    /// `/api/auth` and `/api/auth/login` but not `/api/authx`. The longest
    /// matching prefix wins; among equal-length matches the entry declared
    /// first is kept.
    pub fn resolve(&self, path: &str) -> Option<&RouteEntry> {
        let mut best_match = None;
        let mut best_match_len = 0;

        for entry in &self.entries {
            if prefix_matches(path, &entry.prefix) && entry.prefix.len() > best_match_len {
                best_match = Some(entry);
                best_match_len = entry.prefix.len();
            }
        }

        best_match
    }

    /// Route prefixes in declaration order, as shown in unmatched-route
    /// responses.
    pub fn available_routes(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.prefix.as_str()).collect()
    }
}

fn prefix_matches(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new(&[
            ServiceTarget {
                name: "Auth Service".to_string(),
                route: "/api/auth".to_string(),
                target: "http://localhost:3001".to_string(),
            },
            ServiceTarget {
                name: "User Service".to_string(),
                route: "/api/users".to_string(),
                target: "http://localhost:3002".to_string(),
            },
            ServiceTarget {
                name: "User Search Service".to_string(),
                route: "/api/users/search".to_string(),
                target: "http://localhost:3005".to_string(),
            },
        ])
    }

    #[test]
    fn resolves_by_prefix() {
        let table = table();
        let entry = table.resolve("/api/auth/login").unwrap();
        assert_eq!(entry.service_name, "Auth Service");
    }

    #[test]
    fn exact_prefix_match_resolves() {
        let table = table();
        let entry = table.resolve("/api/auth").unwrap();
        assert_eq!(entry.service_name, "Auth Service");
    }

    #[test]
    fn prefix_only_matches_on_segment_boundary() {
        let table = table();
        assert!(table.resolve("/api/authx").is_none());
        assert!(table.resolve("/api/usersearch").is_none());
    }

    #[test]
    fn longest_prefix_wins() {
        let table = table();

        let entry = table.resolve("/api/users/search/advanced").unwrap();
        assert_eq!(entry.service_name, "User Search Service");

        let entry = table.resolve("/api/users/42").unwrap();
        assert_eq!(entry.service_name, "User Service");
    }

    #[test]
    fn unmatched_path_resolves_to_none() {
        let table = table();
        assert!(table.resolve("/health").is_none());
        assert!(table.resolve("/api/unknown").is_none());
    }

    #[test]
    fn available_routes_keeps_declaration_order() {
        let table = table();
        assert_eq!(
            table.available_routes(),
            vec!["/api/auth", "/api/users", "/api/users/search"]
        );
    }

    #[test]
    fn strip_path_removes_prefix_exactly_once() {
        let table = table();
        let entry = table.resolve("/api/auth/api/auth/login").unwrap();
        assert_eq!(entry.strip_path("/api/auth/api/auth/login"), "/api/auth/login");
    }

    #[test]
    fn strip_path_maps_bare_prefix_to_root() {
        let table = table();
        let entry = table.resolve("/api/auth").unwrap();
        assert_eq!(entry.strip_path("/api/auth"), "/");
        assert_eq!(entry.strip_path("/api/auth/login"), "/login");
    }
}
