use cashbook_parser::parse_line;

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let filename = std::env::args().nth(1).ok_or("filename argument")?;
    let unparsed_file = std::fs::read_to_string(filename)?;

    for line in unparsed_file.lines() {
        match parse_line(line) {
            Ok(parsed) => println!("{:?}", parsed),
            Err(e) => println!("error: {}", e),
        }
    }
    Ok(())
}

fn main() {
    match run() {
        Err(e) => println!("Error: {}", e),
        _ => {}
    }
}
