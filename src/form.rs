use hyper::body::Bytes;

use crate::{error::ParamError, media::MediaType};

/// Read the parameters carried by a form body. Bodies that are not forms
/// carry no parameter.
pub(crate) fn parse(content_type: &MediaType, body: &Bytes) -> Result<Vec<(String, String)>, ParamError> {
    if content_type.is_form() {
        urlencoded(body)
    } else if content_type.is_multipart() {
        multipart(content_type, body)
    } else {
        Ok(Vec::new())
    }
}

fn urlencoded(body: &Bytes) -> Result<Vec<(String, String)>, ParamError> {
    let body = std::str::from_utf8(body.as_ref()).map_err(|e| ParamError::MalformedBody(e.to_string()))?;
    serde_urlencoded::from_str(body).map_err(|e| ParamError::MalformedBody(e.to_string()))
}

#[cfg(feature = "multipart")]
fn multipart(content_type: &MediaType, body: &Bytes) -> Result<Vec<(String, String)>, ParamError> {
    let malformed = |e: multer::Error| ParamError::MalformedBody(e.to_string());

    let boundary = content_type
        .param("boundary")
        .ok_or_else(|| ParamError::MalformedBody("multipart body has no boundary".to_string()))?
        .to_string();

    let bytes = body.clone();
    let stream = futures::stream::once(async move { Ok::<_, std::io::Error>(bytes) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    // The body is already in memory, nothing here waits on I/O
    futures::executor::block_on(async move {
        let mut fields = Vec::new();
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = match field.name() {
                Some(name) => name.to_string(),
                None => continue,
            };

            if field.file_name().is_some() {
                trace!("Skipping file part {} of multipart body", name);
                continue;
            }

            fields.push((name, field.text().await.map_err(malformed)?));
        }
        Ok(fields)
    })
}

#[cfg(not(feature = "multipart"))]
fn multipart(_: &MediaType, _: &Bytes) -> Result<Vec<(String, String)>, ParamError> {
    debug!("Multipart support is disabled, multipart body parameters are ignored");
    Ok(Vec::new())
}
