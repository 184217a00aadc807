//! `/submit` body extraction (multipart or urlencoded)

use crate::server::state::Submission;
use bytes::BufMut;
use futures::{pin_mut, TryStreamExt};
use std::collections::HashMap;
use warp::multipart::{FormData, Part};
use warp::{Filter, Rejection};

pub const TEXT_FIELD: &str = "text_input";
pub const AUDIO_FIELD: &str = "audio_input";

/// Submission body could not be read
#[derive(Debug)]
pub struct MalformedForm(pub String);

impl warp::reject::Reject for MalformedForm {}

/// Extract a [`Submission`] from either form encoding
pub fn submission(
    max_bytes: u64,
) -> impl Filter<Extract = (Submission,), Error = Rejection> + Clone {
    let multipart = warp::multipart::form()
        .max_length(max_bytes)
        .and_then(read_multipart);

    let urlencoded = warp::body::content_length_limit(max_bytes)
        .and(warp::body::form::<HashMap<String, String>>())
        .map(from_fields);

    multipart.or(urlencoded).unify()
}

fn from_fields(mut fields: HashMap<String, String>) -> Submission {
    Submission {
        text_input: fields.remove(TEXT_FIELD),
        audio_input: None,
    }
}

async fn read_multipart(form: FormData) -> Result<Submission, Rejection> {
    let mut submission = Submission::default();
    pin_mut!(form);

    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| warp::reject::custom(MalformedForm(e.to_string())))?
    {
        let name = part.name().to_string();
        match name.as_str() {
            TEXT_FIELD => {
                let bytes = read_part(part).await?;
                let text = String::from_utf8(bytes).map_err(|_| {
                    warp::reject::custom(MalformedForm("text_input is not UTF-8".to_string()))
                })?;
                submission.text_input = Some(text);
            }
            AUDIO_FIELD => {
                submission.audio_input = Some(read_part(part).await?);
            }
            _ => {}
        }
    }

    Ok(submission)
}

async fn read_part(part: Part) -> Result<Vec<u8>, Rejection> {
    part.stream()
        .try_fold(Vec::new(), |mut acc, chunk| async move {
            acc.put(chunk);
            Ok(acc)
        })
        .await
        .map_err(|e| warp::reject::custom(MalformedForm(e.to_string())))
}
