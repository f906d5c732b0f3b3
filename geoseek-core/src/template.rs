//! Text templates with `${path}` substitution.
//!
//! Templates are compiled once and cached by their exact source text so that
//! repeated compilation of the same literal hands back the same
//! `Arc<CompiledTemplate>`. Substitutions only ever read a dotted path from
//! the record being rendered; anything else inside `${...}` is dropped.

use std::num::NonZeroUsize;
use std::sync::{Arc, LazyLock};

use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

static SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]*)\}").expect("substitution span pattern is valid")
});

static PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_$][A-Za-z0-9_$]*(?:\.[A-Za-z_$][A-Za-z0-9_$]*|\[\d+\])*)\s*$")
        .expect("path expression pattern is valid")
});

static SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z_$][A-Za-z0-9_$]*)|\[(\d+)\]").expect("path segment pattern is valid")
});

/// One step of a path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Path(Vec<PathSegment>),
}

/// A template compiled into literal and path parts.
#[derive(Debug, PartialEq, Eq)]
pub struct CompiledTemplate {
    source: String,
    parts: Vec<Part>,
}

impl CompiledTemplate {
    fn parse(source: &str) -> Self {
        let mut parts = Vec::new();
        let mut last = 0;

        for captures in SPAN.captures_iter(source) {
            let (Some(span), Some(body)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if span.start() > last {
                push_literal(&mut parts, &source[last..span.start()]);
            }
            if let Some(path) = parse_path(body.as_str()) {
                parts.push(Part::Path(path));
            } else {
                tracing::debug!("Dropping malformed template span: {}", span.as_str());
            }
            last = span.end();
        }

        if last < source.len() {
            push_literal(&mut parts, &source[last..]);
        }

        Self {
            source: source.to_string(),
            parts,
        }
    }

    /// Returns the source text this template was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns true if the template contains at least one substitution.
    pub fn has_substitutions(&self) -> bool {
        self.parts.iter().any(|part| matches!(part, Part::Path(_)))
    }

    /// Renders the template against a JSON record.
    ///
    /// Missing paths and `null` values render as empty text.
    pub fn render(&self, record: &Value) -> String {
        let mut output = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                Part::Literal(text) => output.push_str(text),
                Part::Path(path) => {
                    if let Some(value) = lookup(record, path) {
                        write_value(&mut output, value);
                    }
                }
            }
        }
        output
    }

    /// Renders the template against any serializable record.
    ///
    /// A record that cannot be serialized renders as if every path were missing.
    pub fn render_serialize<T: Serialize>(&self, record: &T) -> String {
        let value = serde_json::to_value(record).unwrap_or(Value::Null);
        self.render(&value)
    }
}

fn push_literal(parts: &mut Vec<Part>, text: &str) {
    // Adjacent literals appear when a dropped span sat between them.
    if let Some(Part::Literal(previous)) = parts.last_mut() {
        previous.push_str(text);
    } else {
        parts.push(Part::Literal(text.to_string()));
    }
}

fn parse_path(body: &str) -> Option<Vec<PathSegment>> {
    let path = PATH.captures(body)?.get(1)?.as_str();
    SEGMENT
        .captures_iter(path)
        .map(|captures| {
            if let Some(key) = captures.get(1) {
                Some(PathSegment::Key(key.as_str().to_string()))
            } else {
                captures
                    .get(2)
                    .and_then(|index| index.as_str().parse().ok())
                    .map(PathSegment::Index)
            }
        })
        .collect()
}

fn lookup<'a>(record: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    path.iter().try_fold(record, |current, segment| match segment {
        PathSegment::Key(key) => current.get(key.as_str()),
        PathSegment::Index(index) => current.get(*index),
    })
}

fn write_value(output: &mut String, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(text) => output.push_str(text),
        Value::Bool(flag) => output.push_str(if *flag { "true" } else { "false" }),
        Value::Number(number) => output.push_str(&number.to_string()),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    output.push(',');
                }
                write_value(output, item);
            }
        }
        Value::Object(_) => output.push_str(&value.to_string()),
    }
}

/// Cache of compiled templates keyed by exact source text.
///
/// Unbounded by default; a capacity switches to least-recently-used eviction.
#[derive(Debug)]
pub struct TemplateCache {
    entries: Mutex<LruCache<String, Arc<CompiledTemplate>>>,
}

impl TemplateCache {
    /// Creates a cache that never evicts.
    pub fn unbounded() -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
        }
    }

    /// Creates a cache holding at most `capacity` templates.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of compiled templates currently cached.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing has been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn get_or_compile(&self, source: &str) -> Arc<CompiledTemplate> {
        let mut entries = self.entries.lock();
        if let Some(compiled) = entries.get(source) {
            return Arc::clone(compiled);
        }

        let compiled = Arc::new(CompiledTemplate::parse(source));
        entries.put(source.to_string(), Arc::clone(&compiled));
        compiled
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Compiles templates through an injected cache.
///
/// Cloning the resolver shares the cache.
#[derive(Debug, Clone, Default)]
pub struct TemplateResolver {
    cache: Arc<TemplateCache>,
}

impl TemplateResolver {
    /// Creates a resolver backed by the given cache.
    pub fn new(cache: TemplateCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Creates a resolver honouring an optional cache capacity.
    pub fn with_capacity(capacity: Option<NonZeroUsize>) -> Self {
        match capacity {
            Some(capacity) => Self::new(TemplateCache::with_capacity(capacity)),
            None => Self::new(TemplateCache::unbounded()),
        }
    }

    /// Compiles `source`, returning the cached instance when one exists.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use geoseek_core::TemplateResolver;
    ///
    /// let resolver = TemplateResolver::default();
    /// let first = resolver.compile("this is a ${test}");
    /// let second = resolver.compile("this is a ${test}");
    /// assert!(Arc::ptr_eq(&first, &second));
    /// assert_eq!(
    ///     first.render(&serde_json::json!({ "test": "TEST" })),
    ///     "this is a TEST"
    /// );
    /// ```
    pub fn compile(&self, source: &str) -> Arc<CompiledTemplate> {
        self.cache.get_or_compile(source)
    }

    /// Compiles and renders in one step.
    pub fn render(&self, source: &str, record: &Value) -> String {
        self.compile(source).render(record)
    }

    /// The cache backing this resolver.
    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_compile_returns_same_instance() {
        let resolver = TemplateResolver::default();
        let first = resolver.compile("this is a ${test}");
        let second = resolver.compile("this is a ${test}");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.cache().len(), 1);
    }

    #[test]
    fn test_simple_substitution() {
        let resolver = TemplateResolver::default();
        let rendered = resolver.compile("this is a ${test}").render(&json!({"test": "TEST"}));
        assert_eq!(rendered, "this is a TEST");
    }

    #[test]
    fn test_dotted_and_indexed_paths() {
        let resolver = TemplateResolver::default();
        let record = json!({
            "properties": { "name": "Rome", "tags": ["a", "b"], "pop": 2873000 },
        });

        assert_eq!(resolver.render("${properties.name}", &record), "Rome");
        assert_eq!(resolver.render("${ properties.tags[1] }", &record), "b");
        assert_eq!(resolver.render("${properties.tags}", &record), "a,b");
        assert_eq!(resolver.render("pop ${properties.pop}", &record), "pop 2873000");
    }

    #[test]
    fn test_missing_path_renders_empty() {
        let resolver = TemplateResolver::default();
        let record = json!({"properties": {"name": null}});

        assert_eq!(resolver.render("[${properties.name}]", &record), "[]");
        assert_eq!(resolver.render("[${properties.other.deep}]", &record), "[]");
    }

    #[test]
    fn test_malformed_spans_are_dropped() {
        let resolver = TemplateResolver::default();
        let record = json!({"a": "A"});

        assert_eq!(resolver.render("x${alert(1)}y", &record), "xy");
        assert_eq!(resolver.render("${a + 1}-${a}", &record), "-A");
        assert_eq!(resolver.render("${}", &record), "");
        assert_eq!(resolver.render("${window.location}", &record), "");
    }

    #[test]
    fn test_template_without_spans() {
        let resolver = TemplateResolver::default();
        let compiled = resolver.compile("plain text");
        assert!(!compiled.has_substitutions());
        assert_eq!(compiled.render(&json!({})), "plain text");
    }

    #[test]
    fn test_bounded_cache_evicts_least_recent() {
        let resolver = TemplateResolver::with_capacity(NonZeroUsize::new(2));
        let first = resolver.compile("${a}");
        resolver.compile("${b}");
        resolver.compile("${c}");

        assert_eq!(resolver.cache().len(), 2);
        let recompiled = resolver.compile("${a}");
        assert!(!Arc::ptr_eq(&first, &recompiled));
        assert_eq!(recompiled.render(&json!({"a": 1})), "1");
    }

    #[test]
    fn test_render_serialize() {
        #[derive(Serialize)]
        struct Record {
            name: &'static str,
        }

        let resolver = TemplateResolver::default();
        let rendered = resolver.compile("Hello ${name}").render_serialize(&Record { name: "Bob" });
        assert_eq!(rendered, "Hello Bob");
    }

    proptest! {
        #[test]
        fn test_text_without_dollar_renders_verbatim(text in "[^$]*") {
            let resolver = TemplateResolver::default();
            prop_assert_eq!(resolver.render(&text, &json!({})), text);
        }

        #[test]
        fn test_compile_identity_for_any_source(text in ".*") {
            let resolver = TemplateResolver::default();
            let first = resolver.compile(&text);
            let second = resolver.compile(&text);
            prop_assert!(Arc::ptr_eq(&first, &second));
        }
    }
}
