//! Page archiving: fetch a remote page, localize its resource references,
//! and persist a self-contained copy plus a metadata sidecar.
//!
//! Archiving is best-effort by design: any failure is logged and reported as
//! `None`, and note creation carries on with the raw marker left in the body.
//! The one hard rule is the self-reference guard, which refuses to fetch the
//! server's own listening address so a note can never trigger an archival
//! loop against this process.

use crate::models::ArchiveRecord;
use crate::render::html_escape;
use crate::{ARCHIVE_USER_AGENT, FETCH_TIMEOUT_SECS};
use chrono::{Local, NaiveDateTime};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// `+<url>` markers inside a note body signal that the page should be
/// snapshotted locally.
const ARCHIVE_MARKER_PATTERN: &str = r"\+(https?://\S+)";

const REMOVED_ANNOTATION: &str = r#"<span class="archived-link-removed">(link removed)</span>"#;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Directory receiving archived copies and their sidecars.
    pub sites_dir: PathBuf,
    /// The server's own listening port, for the self-reference guard.
    pub server_port: u16,
}

// ============================================================================
// Self-Reference Guard
// ============================================================================

fn is_loopback_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    match bare.parse::<IpAddr>() {
        Ok(ip) => ip.is_loopback() || ip.is_unspecified(),
        Err(_) => false,
    }
}

/// True when the URL points back at this server: a loopback alias on our own
/// listening port. Fetching it would archive the notes UI itself, recursively.
pub fn is_self_reference(url: &Url, server_port: u16) -> bool {
    let host_is_local = url.host_str().map(is_loopback_host).unwrap_or(false);
    host_is_local && url.port_or_known_default() == Some(server_port)
}

// ============================================================================
// Filename Convention
// ============================================================================

/// Reduce a page title to a filesystem-safe name: runs of whitespace,
/// underscores, and hyphens collapse to a single underscore; everything else
/// non-alphanumeric (except periods) is dropped.
pub fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_sep = false;

    for c in title.chars() {
        if c.is_whitespace() || c == '_' || c == '-' {
            pending_sep = !out.is_empty();
        } else if c.is_alphanumeric() || c == '.' {
            if pending_sep {
                out.push('_');
                pending_sep = false;
            }
            out.push(c);
        }
    }

    out
}

/// Parse an archived-copy file stem back into (display timestamp, title,
/// domain). The inverse of the naming done in `archive_page`; the link
/// listing depends on the two staying in sync.
pub fn parse_archive_filename(stem: &str) -> Option<(String, String, String)> {
    let parts: Vec<&str> = stem.splitn(5, '_').collect();
    if parts.len() < 5 {
        return None;
    }

    let raw_ts = parts[..4].join("_");
    let parsed = NaiveDateTime::parse_from_str(&raw_ts, "%Y_%m_%d_%H%M%S").ok()?;
    let (title_raw, domain) = parts[4].rsplit_once('-')?;
    if title_raw.is_empty() || domain.is_empty() {
        return None;
    }

    Some((
        parsed.format("%Y-%m-%d %H:%M:%S").to_string(),
        title_raw.replace('_', " "),
        domain.to_string(),
    ))
}

// ============================================================================
// Metadata Extraction
// ============================================================================

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_title(html: &str) -> Option<String> {
    let re = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok()?;
    let raw = re.captures(html)?.get(1)?.as_str();
    let title = collapse_whitespace(raw);
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Extract `<meta name=... content=...>` for the given name, in either
/// attribute order.
fn extract_meta(html: &str, name: &str) -> Option<String> {
    let patterns = [
        format!(
            r#"(?is)<meta[^>]*name\s*=\s*["']{}["'][^>]*content\s*=\s*["']([^"']*)["']"#,
            name
        ),
        format!(
            r#"(?is)<meta[^>]*content\s*=\s*["']([^"']*)["'][^>]*name\s*=\s*["']{}["']"#,
            name
        ),
    ];

    for pattern in &patterns {
        if let Ok(re) = Regex::new(pattern) {
            if let Some(caps) = re.captures(html) {
                if let Some(m) = caps.get(1) {
                    let value = collapse_whitespace(m.as_str());
                    if !value.is_empty() {
                        return Some(value);
                    }
                }
            }
        }
    }

    None
}

/// Fallback description: first paragraph text, tags stripped, truncated to
/// 200 characters.
fn extract_first_paragraph(html: &str) -> Option<String> {
    let re = Regex::new(r"(?is)<p[^>]*>(.*?)</p>").ok()?;
    let raw = re.captures(html)?.get(1)?.as_str();
    let strip_tags = Regex::new(r"<[^>]+>").ok()?;
    let text = collapse_whitespace(&strip_tags.replace_all(raw, " "));
    if text.is_empty() {
        return None;
    }
    if text.chars().count() > 200 {
        Some(format!("{}...", text.chars().take(200).collect::<String>()))
    } else {
        Some(text)
    }
}

// ============================================================================
// Resource Localization
// ============================================================================

fn extension_for_content_type(content_type: &str) -> &'static str {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        "text/css" => "css",
        "text/javascript" | "application/javascript" => "js",
        _ => "txt",
    }
}

fn sanitize_resource_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    cleaned.trim_matches('_').to_string()
}

/// Rewrite `img src` / `script src` / `link href` references to point at
/// local copies downloaded into the sibling `{base}_files/` folder.
/// References that fail to resolve or download are left untouched.
async fn localize_resources(
    html: &str,
    base_url: &Url,
    client: &reqwest::Client,
    sites_dir: &Path,
    base_name: &str,
) -> String {
    let files_dir_name = format!("{}_files", base_name);
    let files_dir = sites_dir.join(&files_dir_name);

    let patterns = [
        r#"(?i)<img[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#,
        r#"(?i)<script[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#,
        r#"(?i)<link[^>]*?\shref\s*=\s*["']([^"']+)["']"#,
    ];

    let mut references: Vec<String> = Vec::new();
    for pattern in patterns {
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(_) => continue,
        };
        for caps in re.captures_iter(html) {
            if let Some(m) = caps.get(1) {
                let reference = m.as_str().to_string();
                if !references.contains(&reference) {
                    references.push(reference);
                }
            }
        }
    }

    let mut out = html.to_string();

    for reference in references {
        if reference.starts_with("data:") || reference.starts_with('#') {
            continue;
        }
        let resolved = match base_url.join(&reference) {
            Ok(u) => u,
            Err(_) => continue,
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }

        // Query parameters never make it into the local name.
        let url_path = resolved.path().to_string();
        let basename = url_path.rsplit('/').next().unwrap_or("");
        let (raw_stem, path_ext) = match basename.rsplit_once('.') {
            Some((s, e)) if !e.is_empty() && e.len() <= 5 => (s, Some(e.to_string())),
            _ => (basename, None),
        };
        let stem = sanitize_resource_stem(raw_stem);
        if stem.is_empty() {
            continue;
        }

        let response = match client.get(resolved.clone()).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                eprintln!("archive: {} returned {}", resolved, r.status());
                continue;
            }
            Err(e) => {
                eprintln!("archive: failed to download {}: {}", resolved, e);
                continue;
            }
        };

        let ext = path_ext.unwrap_or_else(|| {
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            extension_for_content_type(&content_type).to_string()
        });

        let filename = format!("{}.{}", stem, ext);
        let local_path = files_dir.join(&filename);

        if !local_path.exists() {
            let bytes = match response.bytes().await {
                Ok(b) => b,
                Err(e) => {
                    eprintln!("archive: failed to read {}: {}", resolved, e);
                    continue;
                }
            };
            if let Err(e) = fs::create_dir_all(&files_dir) {
                eprintln!("archive: cannot create {}: {}", files_dir.display(), e);
                continue;
            }
            if let Err(e) = fs::write(&local_path, &bytes) {
                eprintln!("archive: cannot write {}: {}", local_path.display(), e);
                continue;
            }
        }

        let local_rel = format!("{}/{}", files_dir_name, filename);
        out = out.replace(&format!("\"{}\"", reference), &format!("\"{}\"", local_rel));
        out = out.replace(&format!("'{}'", reference), &format!("'{}'", local_rel));
    }

    out
}

// ============================================================================
// Page Archiving
// ============================================================================

/// Fetch `url` and persist a self-contained copy under the sites directory,
/// returning the archive metadata. All failures (and the self-reference
/// guard) log the cause and return `None`; callers never treat that as fatal.
pub async fn archive_page(url: &str, config: &ArchiveConfig) -> Option<ArchiveRecord> {
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("archive: invalid URL {}: {}", url, e);
            return None;
        }
    };
    if is_self_reference(&parsed, config.server_port) {
        eprintln!("archive: refusing to archive own server: {}", url);
        return None;
    }

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .user_agent(ARCHIVE_USER_AGENT)
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("archive: cannot build HTTP client: {}", e);
            return None;
        }
    };

    println!("Fetching: {}", url);
    let response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("archive: fetch failed for {}: {}", url, e);
            return None;
        }
    };
    if !response.status().is_success() {
        eprintln!("archive: {} returned {}", url, response.status());
        return None;
    }
    let html = match response.text().await {
        Ok(t) => t,
        Err(e) => {
            eprintln!("archive: failed to read body of {}: {}", url, e);
            return None;
        }
    };

    let fetched = Local::now();
    let title = extract_title(&html).unwrap_or_else(|| "Untitled".to_string());
    let host = parsed.host_str().unwrap_or("unknown");
    let base_name = format!(
        "{}_{}-{}",
        fetched.format("%Y_%m_%d_%H%M%S"),
        sanitize_title(&title),
        host
    );

    if let Err(e) = fs::create_dir_all(&config.sites_dir) {
        eprintln!(
            "archive: cannot create {}: {}",
            config.sites_dir.display(),
            e
        );
        return None;
    }

    let rewritten =
        localize_resources(&html, &parsed, &client, &config.sites_dir, &base_name).await;

    let html_path = config.sites_dir.join(format!("{}.html", base_name));
    if let Err(e) = fs::write(&html_path, rewritten) {
        eprintln!("archive: cannot write {}: {}", html_path.display(), e);
        return None;
    }

    let record = ArchiveRecord {
        url: url.to_string(),
        fetched_at: fetched.format("%Y-%m-%d %H:%M:%S").to_string(),
        title,
        local_file: html_path,
        keywords: extract_meta(&html, "keywords"),
        description: extract_meta(&html, "description").or_else(|| extract_first_paragraph(&html)),
    };

    let tags_path = config.sites_dir.join(format!("{}.tags", base_name));
    let sidecar = format!(
        "URL: {}\nTitle: {}\nTimestamp: {}\nKeywords: {}\nDescription: {}\n",
        record.url,
        record.title,
        record.fetched_at,
        record.keywords.as_deref().unwrap_or("No keywords found"),
        record.description.as_deref().unwrap_or("No description found"),
    );
    if let Err(e) = fs::write(&tags_path, sidecar) {
        // The copy itself succeeded; a missing sidecar only degrades listing.
        eprintln!("archive: cannot write {}: {}", tags_path.display(), e);
    }

    Some(record)
}

/// The HTML fragment spliced into a note body in place of an archive marker.
pub fn archive_fragment(record: &ArchiveRecord) -> String {
    let file_name = record
        .local_file
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_default();

    format!(
        r#"<div class="archived-link"><a href="{url}">{title}</a><br/><span class="archive-reference"><a href="/assets/sites/{file}">site archive [{ts}]</a></span></div>"#,
        url = html_escape(&record.url),
        title = html_escape(&record.title),
        file = file_name,
        ts = record.fetched_at,
    )
}

/// Process every `+<url>` marker in a note body before persistence:
/// self-referential markers become a "link removed" annotation, successfully
/// archived ones become a link fragment, and failures leave the raw marker
/// intact.
pub async fn process_archive_markers(body: &str, config: &ArchiveConfig) -> String {
    let re = match Regex::new(ARCHIVE_MARKER_PATTERN) {
        Ok(re) => re,
        Err(_) => return body.to_string(),
    };

    let mut replacements: Vec<(usize, usize, String)> = Vec::new();

    for caps in re.captures_iter(body) {
        let (whole, url) = match (caps.get(0), caps.get(1)) {
            (Some(w), Some(u)) => (w, u.as_str()),
            _ => continue,
        };

        if let Ok(parsed) = Url::parse(url) {
            if is_self_reference(&parsed, config.server_port) {
                eprintln!("archive: removed self-referential link: {}", url);
                replacements.push((whole.start(), whole.end(), REMOVED_ANNOTATION.to_string()));
                continue;
            }
        }

        if let Some(record) = archive_page(url, config).await {
            replacements.push((whole.start(), whole.end(), archive_fragment(&record)));
        }
    }

    let mut result = body.to_string();
    for (start, end, replacement) in replacements.into_iter().rev() {
        result.replace_range(start..end, &replacement);
    }

    result
}

// ============================================================================
// Archived-Link Listing
// ============================================================================

/// Scan the sites directory and render the archived-links fragment: one entry
/// per domain, its copies newest-first. Reads the filename convention written
/// by `archive_page`.
pub fn list_archived_links(sites_dir: &Path) -> String {
    let entries = match fs::read_dir(sites_dir) {
        Ok(e) => e,
        Err(_) => return String::new(),
    };

    // domain -> (title, [(display timestamp, file name)])
    let mut groups: BTreeMap<String, (String, Vec<(String, String)>)> = BTreeMap::new();

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map(|e| e != "html").unwrap_or(true) {
            continue;
        }
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s,
            None => continue,
        };
        let file_name = match path.file_name().and_then(|s| s.to_str()) {
            Some(s) => s.to_string(),
            None => continue,
        };

        if let Some((ts, title, domain)) = parse_archive_filename(stem) {
            let group = groups
                .entry(domain)
                .or_insert_with(|| (title.clone(), Vec::new()));
            group.1.push((ts, file_name));
        }
    }

    let mut html = String::new();
    for (domain, (title, mut archives)) in groups {
        archives.sort_by(|a, b| b.0.cmp(&a.0));
        let spans: String = archives
            .iter()
            .map(|(ts, file)| {
                format!(
                    r#"<span class="archive-reference"><a href="/assets/sites/{}">site archive [{}]</a></span>"#,
                    file, ts
                )
            })
            .collect::<Vec<_>>()
            .join("");

        html.push_str(&format!(
            r#"<div class="archived-link"><a href="https://{domain}">{title}</a>{spans}</div>"#,
            domain = domain,
            title = html_escape(&title),
            spans = spans,
        ));
    }

    html
}

// ============================================================================
// Tests
// ============================================================================
