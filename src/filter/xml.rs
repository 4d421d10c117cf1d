//! filter.xml reading and writing

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::{Path, PathBuf};

use super::{Filter, FilterRule, RuleKind};
use crate::error::{SyncError, SyncResult};
use crate::logging::*;

const ROOT_ELEMENT: &str = "workspaceFilter";
const FILTER_ELEMENT: &str = "filter";

fn malformed(message: impl Into<String>) -> SyncError {
	SyncError::MalformedFilter { message: message.into() }
}

fn attribute(element: &BytesStart<'_>, name: &str) -> SyncResult<Option<String>> {
	let attr = element
		.try_get_attribute(name)
		.map_err(|e| malformed(format!("bad attribute on <{}>: {}", element_name(element), e)))?;
	match attr {
		Some(attr) => {
			let value = attr
				.unescape_value()
				.map_err(|e| malformed(format!("bad value for attribute {}: {}", name, e)))?;
			Ok(Some(value.into_owned()))
		}
		None => Ok(None),
	}
}

fn element_name(element: &BytesStart<'_>) -> String {
	String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

/// Filter being assembled while its children are read
struct OpenFilter {
	root: String,
	rules: Vec<FilterRule>,
}

impl OpenFilter {
	fn finish(self) -> Filter {
		Filter::new(self.root, self.rules)
	}
}

/// Parse a `<workspaceFilter>` document into its filters, in document order
pub fn parse_filter_xml(xml: &str) -> SyncResult<Vec<Filter>> {
	let mut reader = Reader::from_str(xml);
	let mut stack: Vec<String> = Vec::new();
	let mut current: Option<OpenFilter> = None;
	let mut filters = Vec::new();

	loop {
		let event = reader.read_event().map_err(|e| {
			malformed(format!("not well-formed at position {}: {}", reader.buffer_position(), e))
		})?;
		match event {
			Event::Start(ref e) | Event::Empty(ref e) => {
				let is_empty = matches!(event, Event::Empty(_));
				let name = element_name(e);
				let parent = stack.last().map(String::as_str);
				match (parent, name.as_str()) {
					(Some(ROOT_ELEMENT), FILTER_ELEMENT) if stack.len() == 1 => {
						let root = attribute(e, "root")?
							.ok_or_else(|| malformed("missing root attribute"))?;
						let open = OpenFilter { root, rules: Vec::new() };
						if is_empty {
							filters.push(open.finish());
						} else {
							current = Some(open);
						}
					}
					(Some(FILTER_ELEMENT), child) if current.is_some() => {
						let kind = match child.to_ascii_lowercase().as_str() {
							"include" => RuleKind::Include,
							"exclude" => RuleKind::Exclude,
							other => return Err(malformed(format!("unknown element [{}]", other))),
						};
						match attribute(e, "pattern")? {
							Some(pattern) => {
								let rule = FilterRule::new(kind, &pattern).map_err(|err| {
									malformed(format!("invalid pattern '{}': {}", pattern, err))
								})?;
								if let Some(open) = current.as_mut() {
									open.rules.push(rule);
								}
							}
							None => warn!("Skipping <{}> without pattern attribute", child),
						}
					}
					_ => {}
				}
				if !is_empty {
					stack.push(name);
				}
			}
			Event::End(_) => {
				if let Some(name) = stack.pop() {
					if name == FILTER_ELEMENT && stack.len() == 1 {
						if let Some(open) = current.take() {
							filters.push(open.finish());
						}
					}
				}
			}
			Event::Eof => break,
			_ => {}
		}
	}

	if !stack.is_empty() {
		return Err(malformed(format!("unexpected end of document inside <{}>", stack.join("/"))));
	}
	if filters.is_empty() {
		return Err(malformed("unknown XML structure, no /workspaceFilter/filter element"));
	}
	Ok(filters)
}

/// Read and parse a filter file from disk
pub fn parse_filter_file(path: &Path) -> SyncResult<Vec<Filter>> {
	let xml = fs::read_to_string(path).map_err(|e| {
		if e.kind() == std::io::ErrorKind::NotFound {
			SyncError::PathNotFound { path: path.display().to_string() }
		} else {
			SyncError::Io(e)
		}
	})?;
	let filters = parse_filter_xml(&xml)?;
	debug!("Parsed {} filter(s) from {}", filters.len(), path.display());
	Ok(filters)
}

/// `<content root>/META-INF/vault/filter.xml`
pub fn default_filter_file(content_root: &Path) -> PathBuf {
	content_root.join("META-INF").join("vault").join("filter.xml")
}

/// Serialize filters in the layout the package manager expects
pub fn write_filter_xml<'a, I>(filters: I) -> String
where
	I: IntoIterator<Item = &'a Filter>,
{
	let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
	out.push_str("<workspaceFilter version=\"1.0\">\n");
	for filter in filters {
		if filter.rules().is_empty() {
			out.push_str(&format!("\t<filter root=\"{}\"/>\n", escape(filter.root())));
			continue;
		}
		out.push_str(&format!("\t<filter root=\"{}\">\n", escape(filter.root())));
		for rule in filter.rules() {
			out.push_str(&format!(
				"\t\t<{} pattern=\"{}\"/>\n",
				rule.kind.element_name(),
				escape(rule.pattern.as_str())
			));
		}
		out.push_str("\t</filter>\n");
	}
	out.push_str("</workspaceFilter>\n");
	out
}


// vim: ts=4
