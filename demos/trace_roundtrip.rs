use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::sync::Arc;
use trace_sequitur::{InputGrammar, InputSequence, SharedGrammar};

/// Compresses a file of little-endian u32 values, writes the result next to
/// it, reads it back and verifies the round trip.
///
/// Usage: cargo run --example trace_roundtrip <filename>
fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <filename>", args[0]);
        std::process::exit(1);
    }

    let filename = &args[1];

    let file = File::open(filename).unwrap_or_else(|_| {
        eprintln!("File \"{}\" not found.", filename);
        std::process::exit(1);
    });

    let grammar = SharedGrammar::new();
    let mut seq = grammar.output_sequence();
    let mut count = 0usize;

    // Read the file as little-endian u32 words
    let mut reader = BufReader::new(file);
    let mut word = [0u8; 4];
    loop {
        match reader.read_exact(&mut word) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => {
                eprintln!("Error reading file: {}", e);
                std::process::exit(1);
            }
        }
        seq.append(u32::from_le_bytes(word));
        count += 1;

        if count % 100_000 == 0 {
            println!("{}", count);
        }
    }
    seq.finish();

    let out_name = format!("{}.seq", filename);
    let out = File::create(&out_name).expect("Cannot create output file");
    let mut writer = BufWriter::new(out);
    grammar.write_to(&mut writer).expect("Error writing grammar");
    seq.write_trailer(&mut writer).expect("Error writing trailer");
    drop(writer);

    // Verify by decoding the written bytes
    let file = File::open(&out_name).expect("Cannot reopen output file");
    let mut reader = BufReader::new(file);
    let loaded =
        Arc::new(InputGrammar::<u32>::read_from(&mut reader).expect("Error reading grammar"));
    let decoded =
        InputSequence::read_trailer(Arc::clone(&loaded), &mut reader).expect("Error reading trailer");

    let file = File::open(filename).expect("Cannot reopen input file");
    let mut reader = BufReader::new(file);
    let mut it = decoded.iter();
    let mut verify_count = 0u64;

    loop {
        match reader.read_exact(&mut word) {
            Ok(()) => {}
            Err(_) => break,
        }
        let file_value = u32::from_le_bytes(word);
        let seq_value = it.next().expect("Sequence ended early");

        if file_value != seq_value {
            eprintln!(
                "Mismatch at position {}: file={}, seq={}",
                verify_count, file_value, seq_value
            );
        }

        verify_count += 1;
    }

    let compressed_len = std::fs::metadata(&out_name).map(|m| m.len()).unwrap_or(0);

    println!("\n=== Statistics ===");
    println!("Values inserted: {}", count);
    println!("Rules in grammar: {}", loaded.rule_count());
    println!("Input bytes: {}", count * 4);
    println!("Compressed bytes: {}", compressed_len);
    if count > 0 {
        println!(
            "Compression ratio: {:.2}%",
            compressed_len as f64 / (count * 4) as f64 * 100.0
        );
    }
}
