use std::{error::Error, path::PathBuf, sync::Arc};

use cipherformula::{
    serialize, BatchEncoder, CKKSEncoder, Decryptor, EvaluationService, Encryptor, Evaluator,
    HeContext, KeyGenerator, LinearFormula, LoopbackChannel, SchemeType, SecurityParameters,
    TransportChannel,
};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

#[derive(Parser)]
#[command(about = "Evaluate arithmetic over encrypted values")]
struct Arguments {

    /// JSON file with the security parameters; a built-in preset is used otherwise.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Seed for key generation and encryption, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Square a batched matrix after adding an alternating constant.
    Batch,
    /// Multiply two encrypted integers.
    Integer {
        #[arg(default_value_t = 37)]
        a: u64,
        #[arg(default_value_t = 49)]
        b: u64,
    },
    /// Basal metabolic rate over encrypted inputs, evaluated behind a transport channel.
    Formula {
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        height: f64,
        #[arg(long)]
        age: f64,
        #[arg(long, default_value_t = 40)]
        log_scale: i32,
    },
    /// Print a parameter preset as JSON.
    Params {
        #[arg(long = "approximate", action = clap::ArgAction::SetTrue)]
        approximate: bool,
    },
}

fn load_parameters(path: &Option<PathBuf>, scheme: SchemeType) -> Result<SecurityParameters, Box<dyn Error>> {
    let parms = match path {
        Some(path) => {
            let parms: SecurityParameters = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            log::info!("loaded parameters from {}", path.display());
            parms
        }
        None => match scheme {
            SchemeType::Exact => SecurityParameters::exact_default()?,
            SchemeType::Approximate => SecurityParameters::approximate_default()?,
        },
    };
    if parms.scheme() != scheme {
        return Err(format!("this command needs {:?} parameters, got {:?}", scheme, parms.scheme()).into());
    }
    Ok(parms)
}

fn create_rng(seed: Option<u64>) -> ChaCha20Rng {
    match seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    }
}

fn print_rows(values: &[u64], row_size: usize) {
    for row in values.chunks(row_size) {
        let shown = row.iter().take(4).map(|x| x.to_string()).collect::<Vec<_>>().join(", ");
        println!("    [{}, ..., {}]", shown, row[row.len() - 1]);
    }
}

/// Rows `[0, 1, 2, 3]` and `[4, 5, 6, 7]`, zero padded.
fn demo_matrix(slot_count: usize, row_size: usize) -> Result<Vec<u64>, Box<dyn Error>> {
    if row_size < 4 {
        return Err(format!("the batch demo needs rows of at least 4 slots, {} slots give {}",
            slot_count, row_size).into());
    }
    let mut matrix = vec![0; slot_count];
    matrix[..4].copy_from_slice(&[0, 1, 2, 3]);
    matrix[row_size..row_size + 4].copy_from_slice(&[4, 5, 6, 7]);
    Ok(matrix)
}

fn run_batch(context: Arc<HeContext>, rng: &mut ChaCha20Rng) -> Result<(), Box<dyn Error>> {
    let keys = KeyGenerator::new(context.clone()).generate(rng);
    let encoder = BatchEncoder::new(context.clone())?;
    let encryptor = Encryptor::new(context.clone(), keys.public_key)?;
    let decryptor = Decryptor::new(context.clone(), keys.secret_key)?;
    let evaluator = Evaluator::new(context);

    let row_size = encoder.slot_count() / encoder.row_count();
    let matrix = demo_matrix(encoder.slot_count(), row_size)?;
    println!("Input matrix:");
    print_rows(&matrix, row_size);

    let encrypted = encryptor.encrypt(&encoder.encode(&matrix)?, rng)?;
    println!("Noise budget in fresh encryption: {} bits", encrypted.noise_budget());

    let constant = (0..encoder.slot_count()).map(|i| (i as u64 & 1) + 1).collect::<Vec<_>>();
    println!("Constant matrix:");
    print_rows(&constant, row_size);
    let sum = evaluator.add_plain(&encrypted, &encoder.encode(&constant)?)?;
    let squared = evaluator.relinearize(&evaluator.square(&sum)?, &keys.relin_keys)?;
    println!("Noise budget after square and relinearize: {} bits (estimated), {} bits (measured)",
        squared.noise_budget(), decryptor.invariant_noise_budget(&squared)?);

    println!("Squared sum:");
    print_rows(&encoder.decode(&decryptor.decrypt(&squared)?)?, row_size);
    Ok(())
}

fn run_integer(context: Arc<HeContext>, rng: &mut ChaCha20Rng, a: u64, b: u64) -> Result<(), Box<dyn Error>> {
    let keys = KeyGenerator::new(context.clone()).generate(rng);
    let encoder = BatchEncoder::new(context.clone())?;
    let encryptor = Encryptor::new(context.clone(), keys.public_key)?;
    let decryptor = Decryptor::new(context.clone(), keys.secret_key)?;
    let evaluator = Evaluator::new(context);

    let plains = [encoder.encode_integer(a)?, encoder.encode_integer(b)?];
    let encrypted = encryptor.encrypt_batch(&plains, rng)?;
    let product = evaluator.relinearize(&evaluator.multiply(&encrypted[0], &encrypted[1])?, &keys.relin_keys)?;
    let decrypted = decryptor.decrypt(&product)?;
    println!("{} x {} = {}", a, b, encoder.decode_integer(&decrypted)?);
    println!("Noise budget left: {} bits", decryptor.invariant_noise_budget(&product)?);
    Ok(())
}

async fn run_formula(context: Arc<HeContext>, rng: &mut ChaCha20Rng, values: [f64; 3], log_scale: i32) -> Result<(), Box<dyn Error>> {
    let scale = 2f64.powi(log_scale);
    let keys = KeyGenerator::new(context.clone()).generate(rng);
    let encoder = CKKSEncoder::new(context.clone())?;
    let encryptor = Encryptor::new(context.clone(), keys.public_key)?;
    let decryptor = Decryptor::new(context.clone(), keys.secret_key)?;

    let formula = LinearFormula::basal_metabolic_rate();
    let plains = values.iter()
        .map(|&v| encoder.encode_f64_single(v, scale))
        .collect::<Result<Vec<_>, _>>()?;
    let request = serialize::serialize_batch(&encryptor.encrypt_batch(&plains, rng)?, &context)?;
    log::info!("sending {} bytes", request.len());

    let channel = LoopbackChannel::new(EvaluationService::new(context.clone(), formula.clone(), scale)?);
    let response = channel.send(request).await?;
    log::info!("received {} bytes", response.len());

    let result = serialize::deserialize(&response, &context)?;
    let decoded = encoder.decode_f64(&decryptor.decrypt(&result)?)?;
    println!("BMR (encrypted): {:.3}", decoded[0]);
    println!("BMR (cleartext): {:.3}", formula.evaluate_plain(&values)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Arguments::parse();
    let mut rng = create_rng(args.seed);

    match args.command {
        Command::Batch => {
            let context = HeContext::new(load_parameters(&args.params, SchemeType::Exact)?)?;
            run_batch(context, &mut rng)
        }
        Command::Integer { a, b } => {
            let context = HeContext::new(load_parameters(&args.params, SchemeType::Exact)?)?;
            run_integer(context, &mut rng, a, b)
        }
        Command::Formula { weight, height, age, log_scale } => {
            let context = HeContext::new(load_parameters(&args.params, SchemeType::Approximate)?)?;
            run_formula(context, &mut rng, [weight, height, age], log_scale).await
        }
        Command::Params { approximate } => {
            let scheme = if approximate {SchemeType::Approximate} else {SchemeType::Exact};
            println!("{}", serde_json::to_string_pretty(&load_parameters(&args.params, scheme)?)?);
            Ok(())
        }
    }
}
