use lispcore::ast::Value;
use lispcore::evaluator::{Environment, Function};
use lispcore::{Error, reader};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;

fn main() {
    let result = panic::catch_unwind(|| {
        run_repl();
    });

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

fn run_repl() {
    println!("lispcore interactive evaluator");
    println!("Enter forms like: (+ 1 2) or (var sq (lambda (x) (* x x)))");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("Could not initialize REPL");
    let mut env = Environment::new();

    // Host function callable from user code, for demonstration purposes
    env.register_builtin("help", 0, true, |_args, _env, _context| {
        print_help();
        Ok(Value::Nil)
    });

    // Lines of a form that is still missing closing parentheses
    let mut pending = String::new();

    loop {
        let prompt = if pending.is_empty() {
            format!("{}> ", env.current_namespace().borrow().name())
        } else {
            "...> ".to_string()
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                if pending.is_empty() {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(trimmed);

                    match trimmed {
                        ":help" => {
                            print_help();
                            continue;
                        }
                        ":env" => {
                            print_environment(&env);
                            continue;
                        }
                        ":quit" | ":exit" => {
                            println!("Goodbye!");
                            break;
                        }
                        _ => {}
                    }
                } else {
                    let _ = rl.add_history_entry(line.trim());
                }

                pending.push_str(&line);
                pending.push('\n');

                match evaluate(&mut env, &pending) {
                    Ok(Some(result)) => println!("{result}"),
                    Ok(None) => continue,
                    Err(e) => println!("Error: {e}"),
                }
                pending.clear();
            }

            Err(ReadlineError::Interrupted) if !pending.is_empty() => {
                pending.clear();
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

/// Evaluate `source`, or return `None` when it ends inside an open form
fn evaluate(env: &mut Environment, source: &str) -> Result<Option<Value>, Error> {
    let data = match reader::parse_data(source, &reader::ReaderConfig::default()) {
        Err(Error::ParseError(msg)) if msg.contains("end of input") => return Ok(None),
        other => other?,
    };

    let mut result = Value::Nil;
    for datum in &data {
        let form = datum.to_value(env)?;
        result = env.eval(&form, &Value::Nil)?;
    }
    Ok(Some(result))
}

fn print_help() {
    println!("lispcore evaluator:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show global bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+C     - Abandon a pending form, or exit");
    println!();
    println!("Forms:");
    println!("  Numbers: 42, -5, 2.5   Strings: \"hi\"   Characters: #\\a");
    println!("  Bindings: var, =, scope");
    println!("  Functions: lambda, macro, &rest, &self, return");
    println!("  Control: if, progn, and, or, while, break, try, throw");
    println!("  Quotation: 'x, `(a ,b ,@c)");
    println!("  Namespaces: namespace, in-namespace, use-namespace, pkg:name");
    println!("  Collections: array, make-array, dictionary, hashtable, elt, length, map");
    println!();
    println!("Examples:");
    println!("  (var fact (lambda (n) (if (< n 2) 1 (* n (&self (- n 1))))))");
    println!("  (fact 10)");
    println!("  (try (throw \"oops\") (lambda (msg) msg))");
    println!();
}

fn print_environment(env: &Environment) {
    let bindings = env.global_bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Global bindings ({} total):", bindings.len());
    println!();

    // Separate built-in functions from user-defined values
    let mut builtins = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in bindings {
        match &value {
            Value::Function(function)
                if matches!(
                    function.as_ref(),
                    Function::Builtin(_) | Function::Assignable(_)
                ) =>
            {
                builtins.push(name);
            }
            _ => user_defined.push((name, value)),
        }
    }

    if !builtins.is_empty() {
        println!("Built-in functions ({}):", builtins.len());
        // Print in columns for readability
        let mut col = 0;
        for name in builtins {
            print!("  {name:<15}");
            col += 1;
            if col % 4 == 0 {
                println!();
            }
        }
        if col % 4 != 0 {
            println!();
        }
        println!();
    }

    if !user_defined.is_empty() {
        println!("Other values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}
