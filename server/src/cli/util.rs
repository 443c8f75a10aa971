use std::io::Write;
use std::str::FromStr;

/// Ask the user interactively for some single-line value in the terminal, until it can be parsed
/// into type [T].
pub fn query_user<T: FromStr>(prompt: &str) -> T
where
    <T as FromStr>::Err: std::fmt::Display,
{
    query_user_and_check(prompt, |_| Ok::<(), &str>(()))
}

/// Ask the user interactively for some single-line value in the terminal. The user's input is
/// converted to type [T] and validated with the provided validation_function. Parsing or
/// validation errors are printed and the user is asked again with the same prompt.
pub fn query_user_and_check<T: FromStr, F, E>(prompt: &str, validation_function: F) -> T
where
    <T as FromStr>::Err: std::fmt::Display,
    F: Fn(&T) -> Result<(), E>,
    E: std::fmt::Display,
{
    loop {
        println!("{}:", prompt);
        let Some(user_input) = read_line() else {
            continue;
        };
        let value = match user_input.parse() {
            Ok(value) => value,
            Err(e) => {
                println!("Error: {}", e);
                continue;
            }
        };
        match validation_function(&value) {
            Ok(()) => return value,
            Err(e) => println!("Error: {}", e),
        }
    }
}

/// Ask the user interactively for a yes/no decision in the terminal. An empty input selects the
/// `default`, if given.
pub fn query_user_bool(prompt: &str, default: Option<bool>) -> bool {
    let value_help = match default {
        Some(true) => "Y/n",
        Some(false) => "y/N",
        None => "y/n",
    };
    loop {
        println!("{} [{}]", prompt, value_help);
        let Some(user_input) = read_line() else {
            continue;
        };
        match (user_input.to_lowercase().as_str(), default) {
            ("y", _) => return true,
            ("n", _) => return false,
            ("", Some(default)) => return default,
            _ => println!("Error: unknown option. Please enter 'y' or 'n'."),
        }
    }
}

/// Print the input marker and read one trimmed line from stdin. Read errors are printed and
/// result in `None`.
fn read_line() -> Option<String> {
    print!("> ");
    // A failed flush only affects the prompt marker
    let _ = std::io::stdout().flush();
    let mut user_input = String::new();
    match std::io::stdin().read_line(&mut user_input) {
        Ok(_) => Some(user_input.trim().to_owned()),
        Err(e) => {
            println!("Error: {}", e);
            None
        }
    }
}
