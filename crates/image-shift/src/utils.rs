use colored::Colorize;
use image_shift_core::{Diagnostic, ShiftOutcome};

/// Print what changed in the new revision
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        println!("  (no container changes)");
        return;
    }

    for diagnostic in diagnostics {
        let line = diagnostic.to_string();
        match diagnostic {
            Diagnostic::ImageChanged { .. } => println!("  • {}", line.cyan()),
            Diagnostic::EnvironmentShadowed { .. } => println!("  • {}", line.yellow()),
            Diagnostic::SecretsAttached { .. } => println!("  • {}", line),
        }
    }
}

/// Print the final result of a run
pub fn print_outcome(outcome: &ShiftOutcome, service: &str) {
    match outcome {
        ShiftOutcome::NoChanges => {
            println!("{}", "no containers to update".yellow());
        }
        ShiftOutcome::Registered { arn, diagnostics } => {
            println!("{}", "✓ new task revision created".green().bold());
            println!("  {}", arn.cyan());
            print_diagnostics(diagnostics);
            println!();
            println!(
                "{}",
                "task update / deployment skipped (use --deploy to update the service)".yellow()
            );
        }
        ShiftOutcome::Deployed { arn, diagnostics } => {
            println!("{}", "✓ new task revision created".green().bold());
            println!("  {}", arn.cyan());
            print_diagnostics(diagnostics);
            println!();
            println!(
                "{} {} {}",
                "✓ service".green().bold(),
                service.cyan(),
                "now uses the new revision".green().bold()
            );
        }
    }
}
