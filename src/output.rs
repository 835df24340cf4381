use std::io::{self, Write};

use serde::Serialize;

use crate::app::{BatchCreateResponse, BatchResolveResponse, FieldsResponse, UploadResponse};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_upload(result: &UploadResponse) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_resolve(result: &BatchResolveResponse) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_create(result: &BatchCreateResponse) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_fields(result: &FieldsResponse) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
