use chrono::{DateTime, SecondsFormat, Utc};

pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
pub const IMAGE_NS: &str = "http://www.google.com/schemas/sitemap-image/1.1";

pub const URLSET_CLOSE: &str = "</urlset>";

/// XML declaration, generation comment and the `<urlset>` open tag.
pub fn header(generated_at: DateTime<Utc>) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!-- Generated on : {} -->\n\
         <urlset xmlns=\"{SITEMAP_NS}\" xmlns:xhtml=\"{XHTML_NS}\" xmlns:image=\"{IMAGE_NS}\">",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    )
}

/// `lastmod` as the sitemap protocol expects it (W3C datetime, explicit offset).
pub fn lastmod(updated_at: DateTime<Utc>) -> String {
    updated_at.to_rfc3339_opts(SecondsFormat::Secs, false)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageEntry {
    pub loc: String,
    pub title: Option<String>,
}

/// One `<url>` block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlEntry {
    pub loc: String,
    pub lastmod: Option<String>,
    pub priority: Option<String>,
    pub changefreq: Option<String>,
    pub images: Vec<ImageEntry>,
}

impl UrlEntry {
    pub fn new(loc: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            ..Default::default()
        }
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from("    <url>\n");
        push_element(&mut out, 8, "loc", &self.loc);
        if let Some(ref lastmod) = self.lastmod {
            push_element(&mut out, 8, "lastmod", lastmod);
        }
        if let Some(ref priority) = self.priority {
            push_element(&mut out, 8, "priority", priority);
        }
        if let Some(ref changefreq) = self.changefreq {
            push_element(&mut out, 8, "changefreq", changefreq);
        }
        for image in &self.images {
            out.push_str("        <image:image>\n");
            push_element(&mut out, 12, "image:loc", &image.loc);
            if let Some(ref title) = image.title {
                push_element(&mut out, 12, "image:title", title);
            }
            out.push_str("        </image:image>\n");
        }
        out.push_str("    </url>");
        out
    }
}

fn push_element(out: &mut String, indent: usize, name: &str, text: &str) {
    out.extend(std::iter::repeat(' ').take(indent));
    out.push('<');
    out.push_str(name);
    out.push('>');
    out.push_str(&escape(text));
    out.push_str("</");
    out.push_str(name);
    out.push_str(">\n");
}

/// Escape text for use inside an element.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("a&b <c> \"d\" 'e'"),
            "a&amp;b &lt;c&gt; &quot;d&quot; &apos;e&apos;"
        );
    }

    #[test]
    fn test_lastmod_keeps_explicit_offset() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(lastmod(at), "2024-03-09T14:05:00+00:00");
    }

    #[test]
    fn test_url_entry_xml() {
        let entry = UrlEntry {
            loc: "http://shop.test/shoes?a=1&b=2".to_string(),
            lastmod: Some("2024-03-09T14:05:00+00:00".to_string()),
            priority: Some("0.8".to_string()),
            changefreq: Some("weekly".to_string()),
            images: vec![],
        };

        assert_eq!(
            entry.to_xml(),
            "    <url>\n\
             \x20       <loc>http://shop.test/shoes?a=1&amp;b=2</loc>\n\
             \x20       <lastmod>2024-03-09T14:05:00+00:00</lastmod>\n\
             \x20       <priority>0.8</priority>\n\
             \x20       <changefreq>weekly</changefreq>\n\
             \x20   </url>"
        );
    }

    #[test]
    fn test_url_entry_with_image() {
        let mut entry = UrlEntry::new("http://shop.test/shoes");
        entry.images.push(ImageEntry {
            loc: "http://shop.test/cache/images/product/abc-shoe.jpg".to_string(),
            title: Some("Shoes & Boots".to_string()),
        });

        let xml = entry.to_xml();
        assert!(xml.contains(
            "<image:loc>http://shop.test/cache/images/product/abc-shoe.jpg</image:loc>"
        ));
        assert!(xml.contains("<image:title>Shoes &amp; Boots</image:title>"));
        assert!(!xml.contains("<priority>"));
    }
}
