/*
 * Copyright (c) 2021 gematik GmbH
 * 
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 * 
 *    http://www.apache.org/licenses/LICENSE-2.0
 * 
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
 */

use std::fs::{read, read_to_string};
use std::path::{Path, PathBuf};
use std::process::exit;
use std::time::Duration;

use log::error;
use openssl::x509::X509;
use resources::{dosage::Dosage, Bundle, OperationOutcome, Resource};
use serde::Serialize;
use serde_json::{from_str, to_string_pretty};
use structopt::StructOpt;
use tokio::runtime::Builder;

use eps_translator::{
    dispatch::{translate, Headers},
    error::Error,
    logging::init_logger,
    signature::{
        prepare_for_signing, revocation::HttpCrlSource, verify_prescription_signature, Algorithm,
        Fragments,
    },
    translation::{
        convert_parent_prescription, dosage::narrate_many, parse_additional_instructions,
        Error as TranslationError,
    },
};

fn main() -> Result<(), Error> {
    let opts = Options::from_args();

    init_logger(&opts.log_config)?;

    match &opts.command {
        Command::Convert { file } => convert(&opts, file),
        Command::Prepare { file, display } => prepare(&opts, file, *display),
        Command::Narrate { file } => {
            let dosages: Vec<Dosage> = from_str(&read_to_string(file)?)?;
            let text = narrate_many(&dosages).map_err(TranslationError::from)?;

            println!("{}", text);

            Ok(())
        }
        Command::Verify { file, ca } => verify(&opts, file, ca),
        Command::Instructions { text } => print_json(&parse_additional_instructions(text)),
    }
}

fn convert(opts: &Options, file: &Path) -> Result<(), Error> {
    let resource: Resource = from_str(&read_to_string(file)?)?;
    let headers = Headers {
        from_asid: required(opts.from_asid.as_deref(), "--from-asid")?,
        to_asid: required(opts.to_asid.as_deref(), "--to-asid")?,
        sds_user_id: opts.sds_user_id.clone(),
        sds_role_id: opts.sds_role_id.clone(),
    };

    match translate(&resource, &headers) {
        Ok(xml) => {
            println!("{}", xml);

            Ok(())
        }
        Err(err) => {
            error!("Unable to translate {}: {}", file.display(), err);

            print_json(&OperationOutcome::from(&err))?;

            exit(1);
        }
    }
}

fn prepare(opts: &Options, file: &Path, display: bool) -> Result<(), Error> {
    let bundle: Bundle = from_str(&read_to_string(file)?)?;
    let parent_prescription = convert_parent_prescription(&bundle)?;

    if display {
        let fragments = Fragments::from_parent_prescription(&parent_prescription)?;

        print_json(&fragments.summary())
    } else {
        print_json(&prepare_for_signing(&parent_prescription, opts.hash)?)
    }
}

fn verify(opts: &Options, file: &Path, ca: &[PathBuf]) -> Result<(), Error> {
    let bundle: Bundle = from_str(&read_to_string(file)?)?;
    let parent_prescription = convert_parent_prescription(&bundle)?;

    let mut trusted = Vec::new();
    for path in ca {
        trusted.extend(X509::stack_from_pem(&read(path)?)?);
    }

    let crl_source = HttpCrlSource::new(Duration::from_secs(opts.crl_timeout))?;

    let mut runtime = Builder::new().threaded_scheduler().enable_all().build()?;
    let failures = runtime.block_on(verify_prescription_signature(
        &parent_prescription,
        &trusted,
        &crl_source,
    ))?;

    let failures = failures.iter().map(ToString::to_string).collect::<Vec<_>>();

    print_json(&failures)
}

fn required(value: Option<&str>, name: &str) -> Result<String, Error> {
    value
        .map(ToOwned::to_owned)
        .ok_or_else(|| Error::Generic(format!("Missing required option {}", name)))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", to_string_pretty(value)?);

    Ok(())
}

#[derive(Clone, StructOpt)]
struct Options {
    #[structopt(short = "c", long = "config", default_value = "./log4rs.yml")]
    log_config: PathBuf,

    #[structopt(long = "from-asid", env = "TRANSLATOR_FROM_ASID")]
    from_asid: Option<String>,

    #[structopt(long = "to-asid", env = "TRANSLATOR_TO_ASID")]
    to_asid: Option<String>,

    #[structopt(long = "sds-user-id")]
    sds_user_id: Option<String>,

    #[structopt(long = "sds-role-id")]
    sds_role_id: Option<String>,

    /// Timeout of CRL downloads in seconds.
    #[structopt(long = "crl-timeout", default_value = "10")]
    crl_timeout: u64,

    /// Hashing algorithm of prepared signatures (sha1 or sha256).
    #[structopt(long = "hash", default_value = "sha1")]
    hash: Algorithm,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Clone, StructOpt)]
enum Command {
    /// Translates a FHIR resource into its HL7v3 message.
    Convert { file: PathBuf },

    /// Calculates the signing parameters of a prescription order bundle.
    Prepare {
        file: PathBuf,

        /// Prints the summary of the signed content instead.
        #[structopt(long = "display")]
        display: bool,
    },

    /// Renders a list of FHIR dosages as text.
    Narrate { file: PathBuf },

    /// Verifies the prescriber signature of a prescription order bundle.
    Verify {
        file: PathBuf,

        /// PEM file of a trusted CA certificate.
        #[structopt(long = "ca")]
        ca: Vec<PathBuf>,
    },

    /// Splits an additional instructions text into its parts.
    Instructions { text: String },
}
