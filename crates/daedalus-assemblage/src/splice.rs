//! Splicing of referenced content into a rendered body.
//!
//! A reference block is replaced by the body of its sub-request when the
//! request-node tree names it. The spliced response carries one
//! [`IndexKind::Injected`] index per replaced block, followed by the
//! indexes of the injected body, prefixed with the block name and moved to
//! their new offsets.

use bytes::Bytes;
use daedalus_core::code::ASSEMBLAGE_UNAVAILABLE;
use daedalus_core::headers::{CONTENT_INDEX, X_FILTER, X_HTTP_METHOD_OVERRIDE};
use daedalus_core::{format_content_index, Dispatch, Index, IndexKind, Request, Response};
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::HeaderMap;

use crate::error::Unavailable;
use crate::node::RequestNode;

/// Builds the `GET` resolving a reference.
///
/// The main request headers are carried over, except the ones describing
/// the main request itself.
#[must_use]
pub fn sub_request(uri: &str, node: &RequestNode, headers: &HeaderMap) -> Request {
    let mut request = Request::get(uri);
    request.parameters.extend(node.parameters.iter().cloned());
    for (name, value) in headers {
        let skipped = *name == CONTENT_TYPE
            || *name == CONTENT_LENGTH
            || name.as_str() == X_FILTER
            || name.as_str() == X_HTTP_METHOD_OVERRIDE;
        if !skipped {
            request.headers.append(name.clone(), value.clone());
        }
    }
    request
}

/// Dispatches the sub-request of a reference and assembles its answer.
pub fn fetch(
    inner: &dyn Dispatch,
    uri: &str,
    node: &RequestNode,
    headers: &HeaderMap,
) -> Result<Response, Unavailable> {
    let mut response = inner.dispatch(sub_request(uri, node, headers));
    if !response.is_success {
        return Err(Unavailable {
            uri: uri.to_string(),
            status: response.status,
            reason: response.text.clone().unwrap_or_else(|| response.code.clone()),
        });
    }
    if response.body.is_empty() {
        return Err(Unavailable {
            uri: uri.to_string(),
            status: ASSEMBLAGE_UNAVAILABLE.status(),
            reason: ASSEMBLAGE_UNAVAILABLE.code().to_string(),
        });
    }
    if !node.is_leaf() {
        assemble(inner, &mut response, node, headers);
    }
    Ok(response)
}

/// Replaces the reference blocks `node` names with their content.
///
/// Blocks whose sub-request fails are left as they are. Returns the
/// number of injected blocks.
pub fn assemble(inner: &dyn Dispatch, response: &mut Response, node: &RequestNode, headers: &HeaderMap) -> usize {
    let mut indexes = std::mem::take(&mut response.indexes);
    indexes.sort_by_key(|index| index.start);

    let body = response.body.clone();
    let mut output: Vec<u8> = Vec::with_capacity(body.len());
    let mut placed: Vec<Index> = Vec::with_capacity(indexes.len());
    let mut cursor = 0;
    let mut injected = 0;

    for index in indexes {
        if index.start < cursor || index.end > body.len() || index.is_empty() {
            tracing::trace!(%index, "Index dropped");
            continue;
        }
        let replacement = match (index.kind, &index.reference, node.find(&index.name)) {
            (IndexKind::Reference, Some(uri), Some(subnode)) => match fetch(inner, uri, subnode, headers) {
                Ok(content) => Some(content),
                Err(error) => {
                    tracing::debug!(%error, name = %index.name, "Reference kept");
                    None
                }
            },
            _ => None,
        };

        let end = index.end;
        output.extend_from_slice(&body[cursor..index.start]);
        let start = output.len();
        match replacement {
            Some(content) => {
                output.extend_from_slice(&content.body);
                let prefix = index.name.clone();
                placed.push(Index {
                    kind: IndexKind::Injected,
                    start,
                    end: output.len(),
                    ..index
                });
                for nested in content.indexes {
                    placed.push(Index {
                        name: format!("{prefix}.{}", nested.name),
                        start: nested.start + start,
                        end: nested.end + start,
                        ..nested
                    });
                }
                injected += 1;
            }
            None => {
                output.extend_from_slice(&body[index.start..end]);
                placed.push(Index {
                    start,
                    end: output.len(),
                    ..index
                });
            }
        }
        cursor = end;
    }
    output.extend_from_slice(&body[cursor..]);

    placed.sort_by_key(|index| (index.start, std::cmp::Reverse(index.end)));
    if injected > 0 {
        response.body = Bytes::from(output);
    }
    response.indexes = placed;
    refresh_headers(response);
    injected
}

/// Updates `Content-Length` and `Content-Index` after a body change.
pub fn refresh_headers(response: &mut Response) {
    response
        .headers
        .insert(CONTENT_LENGTH, HeaderValue::from(response.body.len()));
    let name = HeaderName::from_static(CONTENT_INDEX);
    if response.indexes.is_empty() {
        response.headers.remove(&name);
        return;
    }
    match HeaderValue::from_str(&format_content_index(&response.indexes)) {
        Ok(value) => {
            response.headers.insert(name, value);
        }
        Err(error) => tracing::warn!(%error, "Content-Index dropped"),
    }
}
