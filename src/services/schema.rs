//! Schema.org JSON-LD builders
//!
//! Pure functions mapping content to JSON-LD objects. Optional values that are
//! absent or blank add no key at all, so the emitted markup never carries
//! `null` or empty strings.

use serde_json::{json, Map, Value};

use crate::models::{Author, Category, Faq, Post};
use crate::services::seo::{author_path, post_path, Breadcrumb};
use crate::services::settings::{non_empty, SiteSettings};

const SCHEMA_CONTEXT: &str = "https://schema.org";

/// Incremental builder for one schema.org object
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    fields: Map<String, Value>,
}

impl SchemaBuilder {
    /// Top-level object carrying `@context`
    pub fn new(schema_type: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("@context".to_string(), Value::from(SCHEMA_CONTEXT));
        fields.insert("@type".to_string(), Value::from(schema_type));
        Self { fields }
    }

    /// Nested object, without `@context`
    pub fn nested(schema_type: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("@type".to_string(), Value::from(schema_type));
        Self { fields }
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Set `key` only when a value is present
    pub fn optional(self, key: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.field(key, value),
            None => self,
        }
    }

    /// Set `key` only when the text is present and not blank
    pub fn text(self, key: &str, value: Option<&str>) -> Self {
        self.optional(key, value.and_then(non_empty))
    }

    /// Set `key` only when the list is not empty
    pub fn list(self, key: &str, values: Vec<Value>) -> Self {
        if values.is_empty() {
            self
        } else {
            self.field(key, Value::Array(values))
        }
    }

    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

/// `Organization` for the site publisher
pub fn organization(settings: &SiteSettings) -> Value {
    let logo = settings
        .logo_url()
        .map(|url| SchemaBuilder::nested("ImageObject").field("url", url).build());
    let twitter = non_empty(&settings.twitter_handle)
        .map(|handle| Value::from(format!("https://twitter.com/{}", handle)));

    SchemaBuilder::new("Organization")
        .field("name", settings.site_name.as_str())
        .field("url", settings.site_url.as_str())
        .optional("logo", logo)
        .list("sameAs", twitter.into_iter().collect())
        .build()
}

/// `WebSite` with a sitelinks `SearchAction`
pub fn website(settings: &SiteSettings) -> Value {
    let search = SchemaBuilder::nested("SearchAction")
        .field(
            "target",
            json!({
                "@type": "EntryPoint",
                "urlTemplate": format!("{}/search?q={{search_term_string}}", settings.site_url),
            }),
        )
        .field("query-input", "required name=search_term_string")
        .build();

    SchemaBuilder::new("WebSite")
        .field("name", settings.site_name.as_str())
        .field("url", settings.site_url.as_str())
        .text("description", Some(settings.site_description.as_str()))
        .text("inLanguage", Some(settings.language.as_str()))
        .field("potentialAction", search)
        .build()
}

/// `Person` for an author byline
pub fn person(author: &Author, settings: &SiteSettings) -> Value {
    person_builder(SchemaBuilder::new("Person"), author, settings).build()
}

fn person_builder(builder: SchemaBuilder, author: &Author, settings: &SiteSettings) -> SchemaBuilder {
    let same_as = author
        .same_as
        .iter()
        .filter_map(|url| non_empty(url))
        .map(Value::from)
        .collect();

    builder
        .field("name", author.name.as_str())
        .field("url", settings.absolute_url(&author_path(&author.slug)))
        .text("description", author.bio.as_deref())
        .optional(
            "image",
            author
                .avatar
                .as_deref()
                .and_then(non_empty)
                .map(|avatar| settings.absolute_url(avatar)),
        )
        .text("jobTitle", author.job_title.as_deref())
        .list("sameAs", same_as)
}

/// `BlogPosting` for a post page
pub fn blog_posting(
    post: &Post,
    author: Option<&Author>,
    category: Option<&Category>,
    settings: &SiteSettings,
) -> Value {
    let url = settings.absolute_url(&post_path(&post.slug));
    let image = post
        .seo
        .og_image
        .as_deref()
        .and_then(non_empty)
        .or(post.cover_image.as_deref().and_then(non_empty))
        .map(|image| settings.absolute_url(image));

    let author = author.map(|a| person_builder(SchemaBuilder::nested("Person"), a, settings).build());
    let publisher = {
        let logo = settings
            .logo_url()
            .map(|url| SchemaBuilder::nested("ImageObject").field("url", url).build());
        SchemaBuilder::nested("Organization")
            .field("name", settings.site_name.as_str())
            .optional("logo", logo)
            .build()
    };

    SchemaBuilder::new("BlogPosting")
        .field("headline", post.display_title())
        .text("description", post.display_description())
        .field("url", url.as_str())
        .field("mainEntityOfPage", json!({ "@type": "WebPage", "@id": url }))
        .optional("image", image)
        .optional("datePublished", post.published_at.map(|t| t.to_rfc3339()))
        .field("dateModified", post.updated_at.to_rfc3339())
        .optional("author", author)
        .field("publisher", publisher)
        .optional("articleSection", category.map(|c| c.name.as_str()))
        .text("keywords", post.seo.focus_keyword.as_deref())
        .field("timeRequired", format!("PT{}M", post.reading_minutes.max(1)))
        .text("inLanguage", Some(settings.language.as_str()))
        .build()
}

/// `BreadcrumbList` from a trail
pub fn breadcrumb_list(trail: &[Breadcrumb], settings: &SiteSettings) -> Value {
    let items = trail
        .iter()
        .enumerate()
        .map(|(index, crumb)| {
            SchemaBuilder::nested("ListItem")
                .field("position", index + 1)
                .field("name", crumb.name.as_str())
                .field("item", settings.absolute_url(&crumb.path))
                .build()
        })
        .collect();

    SchemaBuilder::new("BreadcrumbList")
        .field("itemListElement", Value::Array(items))
        .build()
}

/// `FAQPage`, or `None` when there are no complete question/answer pairs
pub fn faq_page(faqs: &[Faq]) -> Option<Value> {
    let questions: Vec<Value> = faqs
        .iter()
        .filter_map(|faq| {
            let question = non_empty(&faq.question)?;
            let answer = non_empty(&faq.answer)?;
            Some(
                SchemaBuilder::nested("Question")
                    .field("name", question)
                    .field(
                        "acceptedAnswer",
                        SchemaBuilder::nested("Answer").field("text", answer).build(),
                    )
                    .build(),
            )
        })
        .collect();

    if questions.is_empty() {
        return None;
    }

    Some(
        SchemaBuilder::new("FAQPage")
            .field("mainEntity", Value::Array(questions))
            .build(),
    )
}

/// `CollectionPage` for a hub or category landing page, listing its posts
pub fn collection_page(
    name: &str,
    description: Option<&str>,
    path: &str,
    posts: &[Post],
    settings: &SiteSettings,
) -> Value {
    let items: Vec<Value> = posts
        .iter()
        .enumerate()
        .map(|(index, post)| {
            SchemaBuilder::nested("ListItem")
                .field("position", index + 1)
                .field("url", settings.absolute_url(&post_path(&post.slug)))
                .field("name", post.title.as_str())
                .build()
        })
        .collect();

    let item_list = SchemaBuilder::nested("ItemList")
        .field("numberOfItems", items.len())
        .field("itemListElement", Value::Array(items))
        .build();

    SchemaBuilder::new("CollectionPage")
        .field("name", name)
        .text("description", description)
        .field("url", settings.absolute_url(path))
        .field("mainEntity", item_list)
        .build()
}

/// Render a `<script type="application/ld+json">` block.
///
/// `</` is escaped so post text can never close the script element early.
pub fn json_ld_script(value: &Value) -> String {
    format!(
        "<script type=\"application/ld+json\">{}</script>",
        value.to_string().replace("</", "<\\/")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostStatus;
    use crate::services::seo::post_breadcrumbs;
    use chrono::Utc;

    fn sample_post() -> Post {
        Post::new(
            "rust-tips".to_string(),
            "Rust Tips".to_string(),
            "Body".to_string(),
            "<p>Body</p>".to_string(),
            1,
            PostStatus::Published,
        )
    }

    fn sample_author() -> Author {
        Author {
            id: 1,
            slug: "ada".to_string(),
            name: "Ada".to_string(),
            bio: None,
            avatar: None,
            job_title: Some("Editor".to_string()),
            website: None,
            same_as: vec!["https://github.com/ada".to_string(), " ".to_string()],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_builder_skips_absent_values() {
        let value = SchemaBuilder::new("Thing")
            .optional("a", None::<String>)
            .text("b", Some("   "))
            .text("c", None)
            .list("d", vec![])
            .field("e", "kept")
            .build();

        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(object["@context"], "https://schema.org");
        assert_eq!(object["e"], "kept");
    }

    #[test]
    fn test_blog_posting_minimal() {
        let settings = SiteSettings::default();
        let value = blog_posting(&sample_post(), None, None, &settings);

        assert_eq!(value["@type"], "BlogPosting");
        assert_eq!(value["headline"], "Rust Tips");
        assert_eq!(value["url"], "http://localhost:8080/posts/rust-tips");
        assert!(value.get("author").is_none());
        assert!(value.get("image").is_none());
        assert!(value.get("description").is_none());
        assert!(value.get("articleSection").is_none());
        assert_eq!(value["timeRequired"], "PT1M");
    }

    #[test]
    fn test_blog_posting_with_author_and_category() {
        let settings = SiteSettings::default();
        let category = Category::new("tips".to_string(), "Tips".to_string(), None, 0);
        let author = sample_author();

        let value = blog_posting(&sample_post(), Some(&author), Some(&category), &settings);
        assert_eq!(value["author"]["@type"], "Person");
        assert!(value["author"].get("@context").is_none());
        assert_eq!(value["author"]["jobTitle"], "Editor");
        assert_eq!(value["articleSection"], "Tips");
    }

    #[test]
    fn test_person_filters_blank_profiles() {
        let value = person(&sample_author(), &SiteSettings::default());
        assert_eq!(value["sameAs"], json!(["https://github.com/ada"]));
        assert_eq!(value["url"], "http://localhost:8080/authors/ada");
        assert!(value.get("description").is_none());
    }

    #[test]
    fn test_faq_page() {
        assert!(faq_page(&[]).is_none());
        assert!(faq_page(&[Faq {
            question: "Q?".to_string(),
            answer: "".to_string(),
        }])
        .is_none());

        let value = faq_page(&[Faq {
            question: "Why?".to_string(),
            answer: "Because.".to_string(),
        }])
        .unwrap();
        assert_eq!(value["mainEntity"][0]["name"], "Why?");
        assert_eq!(value["mainEntity"][0]["acceptedAnswer"]["text"], "Because.");
    }

    #[test]
    fn test_breadcrumb_list_positions() {
        let settings = SiteSettings::default();
        let trail = post_breadcrumbs(&sample_post(), None);
        let value = breadcrumb_list(&trail, &settings);

        assert_eq!(value["itemListElement"][0]["position"], 1);
        assert_eq!(value["itemListElement"][0]["item"], "http://localhost:8080/");
        assert_eq!(value["itemListElement"][1]["position"], 2);
        assert_eq!(value["itemListElement"][1]["name"], "Rust Tips");
    }

    #[test]
    fn test_website_and_organization() {
        let settings = SiteSettings::default();
        let site = website(&settings);
        assert_eq!(site["potentialAction"]["@type"], "SearchAction");
        assert_eq!(
            site["potentialAction"]["target"]["urlTemplate"],
            "http://localhost:8080/search?q={search_term_string}"
        );

        let org = organization(&settings);
        assert!(org.get("logo").is_none());
        assert!(org.get("sameAs").is_none());
    }

    #[test]
    fn test_collection_page() {
        let settings = SiteSettings::default();
        let value = collection_page("Guides", None, "/hubs/guides", &[sample_post()], &settings);
        assert_eq!(value["mainEntity"]["numberOfItems"], 1);
        assert_eq!(
            value["mainEntity"]["itemListElement"][0]["url"],
            "http://localhost:8080/posts/rust-tips"
        );
    }

    #[test]
    fn test_json_ld_script_escapes_closing_tags() {
        let value = json!({"headline": "</script><script>alert(1)</script>"});
        let html = json_ld_script(&value);
        assert!(html.starts_with("<script type=\"application/ld+json\">"));
        assert_eq!(html.matches("</script>").count(), 1);
        assert!(html.contains("<\\/script>"));
    }
}
