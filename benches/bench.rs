use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cipherformula::{
    serialize, BatchEncoder, CKKSEncoder, Decryptor, Encryptor, Evaluator, HeContext,
    KeyGenerator, Plaintext, SecurityParameters,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn test_suite<F: Fn(&str) -> String>(
    c: &mut Criterion, get_name: F,
    context: std::sync::Arc<HeContext>,
    encode: &dyn Fn() -> Plaintext,
) {
    let mut rng = ChaCha20Rng::seed_from_u64(0);
    let keys = KeyGenerator::new(context.clone()).generate(&mut rng);
    let encryptor = Encryptor::new(context.clone(), keys.public_key.clone()).unwrap();
    let decryptor = Decryptor::new(context.clone(), keys.secret_key.clone()).unwrap();
    let evaluator = Evaluator::new(context.clone());

    c.bench_function(&get_name("Encode"), |b| b.iter(encode));

    let plain = encode();
    c.bench_function(&get_name("Encrypt"), |b| b.iter(|| encryptor.encrypt(black_box(&plain), &mut rng).unwrap()));
    c.bench_function(&get_name("EncryptSym"), |b| b.iter(|| {
        encryptor.encrypt_symmetric(black_box(&plain), &keys.secret_key, &mut rng).unwrap()
    }));

    let cipher1 = encryptor.encrypt(&plain, &mut rng).unwrap();
    let cipher2 = encryptor.encrypt(&plain, &mut rng).unwrap();
    c.bench_function(&get_name("Decrypt"), |b| b.iter(|| decryptor.decrypt(black_box(&cipher1)).unwrap()));

    c.bench_function(&get_name("Add"), |b| b.iter(|| evaluator.add(&cipher1, &cipher2).unwrap()));
    c.bench_function(&get_name("AddPlain"), |b| b.iter(|| evaluator.add_plain(&cipher1, &plain).unwrap()));
    c.bench_function(&get_name("Mul"), |b| b.iter(|| evaluator.multiply(&cipher1, &cipher2).unwrap()));
    c.bench_function(&get_name("MulPlain"), |b| b.iter(|| evaluator.multiply_plain(&cipher1, &plain).unwrap()));
    c.bench_function(&get_name("Square"), |b| b.iter(|| evaluator.square(&cipher1).unwrap()));

    let cipher3 = evaluator.multiply(&cipher1, &cipher2).unwrap();
    c.bench_function(&get_name("Relinear"), |b| b.iter(|| evaluator.relinearize(&cipher3, &keys.relin_keys).unwrap()));

    c.bench_function(&get_name("Serialize"), |b| b.iter(|| serialize::serialize(black_box(&cipher3), &context).unwrap()));
    let bytes = serialize::serialize(&cipher3, &context).unwrap();
    c.bench_function(&get_name("Deserialize"), |b| b.iter(|| serialize::deserialize(black_box(&bytes), &context).unwrap()));
}

fn bench_exact(c: &mut Criterion) {
    let context = HeContext::new(SecurityParameters::exact_default().unwrap()).unwrap();
    let encoder = BatchEncoder::new(context.clone()).unwrap();
    let message = (0..encoder.slot_count() as u64).collect::<Vec<_>>();
    test_suite(c, |x| format!("exact/{}", x), context, &|| encoder.encode(&message).unwrap());
}

fn bench_approximate(c: &mut Criterion) {
    let context = HeContext::new(SecurityParameters::approximate_default().unwrap()).unwrap();
    let encoder = CKKSEncoder::new(context.clone()).unwrap();
    let message = (0..encoder.slot_count()).map(|i| i as f64 / 7.0).collect::<Vec<_>>();
    let scale = 2f64.powi(40);
    test_suite(c, |x| format!("approximate/{}", x), context, &|| encoder.encode_f64(&message, scale).unwrap());
}

criterion_group!{
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_exact, bench_approximate
}
criterion_main!(benches);
