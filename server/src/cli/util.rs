use std::io::Write;
use std::str::FromStr;

/// Print the prompt and read one line from stdin. Returns None on IO errors, after printing the
/// error.
fn prompt_line(prompt: &str) -> Option<String> {
    println!("{}", prompt);
    print!("> ");
    if let Err(e) = std::io::stdout().flush() {
        println!("Error: {}", e);
    }
    let mut user_input = String::new();
    match std::io::stdin().read_line(&mut user_input) {
        Ok(_) => Some(user_input.trim().to_owned()),
        Err(e) => {
            println!("Error: {}", e);
            None
        }
    }
}

/// Ask the user interactively for some single-line value in the terminal. The user's input is
/// converted to type [T] and validated with the provided validation_function. In case of a parsing
/// error or validation error, the error is printed and the user is queried again and again with
/// same prompt until the entered value is valid.
pub fn query_user_and_check<T: FromStr, F, E>(prompt: &str, validation_function: F) -> T
where
    <T as FromStr>::Err: std::fmt::Display,
    F: Fn(&T) -> Result<(), E>,
    E: std::fmt::Display,
{
    loop {
        let Some(user_input) = prompt_line(&format!("{}:", prompt)) else {
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

/// Ask the user interactively for a boolean value in the terminal (entered as y/n). An empty input
/// selects the `default`, if given. Otherwise, the user is queried again until a valid option is
/// entered.
pub fn query_user_bool(prompt: &str, default: Option<bool>) -> bool {
    let value_help = match default {
        Some(true) => "Y/n",
        Some(false) => "y/N",
        None => "y/n",
    };
    loop {
        let Some(user_input) = prompt_line(&format!("{} [{}]", prompt, value_help)) else {
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
