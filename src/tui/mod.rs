//! Interactive terminal — stdin/stdout REPL with slash commands.
//!
//! Commands map 1:1 onto session operations; any other input is sent as a
//! chat message. Store and provider errors are printed and never terminate
//! the loop.

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::error;

use crate::config::ChatConfig;
use crate::session::{LoadOutcome, SendOutcome, SessionManager, SessionState};
use crate::store::Role;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[90m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";

/// The interactive chat loop. One user action runs to completion before the
/// next line is read.
pub struct InteractiveTui {
    manager: SessionManager,
    state: SessionState,
    list_limit: usize,
}

impl InteractiveTui {
    pub fn new(manager: SessionManager, state: SessionState, config: &ChatConfig) -> Self {
        Self {
            manager,
            state,
            list_limit: config.list_limit,
        }
    }

    /// Run until `/exit` or EOF.
    pub async fn run(&mut self) -> std::io::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        clear_screen();
        self.print_header();

        // Auto-create the first conversation so typing works immediately.
        self.start_new_conversation().await;
        println!("\n{GREEN}Ready! Type your message or use /help for commands.{RESET}");

        loop {
            eprint!("\n{CYAN}❯{RESET} ");
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break, // EOF
                Err(e) => {
                    error!("Error reading stdin: {}", e);
                    break;
                }
            };

            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            if input.starts_with('/') {
                if !self.handle_command(input, &mut lines).await {
                    break;
                }
            } else {
                self.send_message(input).await;
            }
        }

        Ok(())
    }

    /// Dispatch a slash command. Returns false when the loop should stop.
    async fn handle_command(&mut self, command: &str, lines: &mut Lines<BufReader<Stdin>>) -> bool {
        match command.to_lowercase().as_str() {
            "/new" => {
                self.start_new_conversation().await;
                true
            }
            "/list" => {
                self.list_conversations().await;
                true
            }
            "/load" => {
                self.load_conversation(lines).await;
                true
            }
            "/history" => {
                self.show_history().await;
                true
            }
            "/clear" => {
                clear_screen();
                self.print_header();
                true
            }
            "/help" => {
                self.print_header();
                true
            }
            "/exit" => {
                println!("\n{YELLOW}👋 Goodbye!{RESET}\n");
                false
            }
            _ => {
                println!("{RED}❌ Unknown command: {command}{RESET}");
                println!("Type {GREEN}/help{RESET} to see available commands.");
                true
            }
        }
    }

    async fn start_new_conversation(&mut self) {
        match self.manager.start_new(&mut self.state).await {
            Ok(id) => {
                println!("\n{GREEN}✓{RESET} New conversation started: {CYAN}{id}{RESET}");
            }
            Err(e) => println!("{RED}❌ Error creating conversation:{RESET} {e}"),
        }
    }

    async fn list_conversations(&mut self) {
        let conversations = match self.manager.list(&self.state, self.list_limit).await {
            Ok(conversations) => conversations,
            Err(e) => {
                println!("{RED}❌ Error listing conversations:{RESET} {e}");
                return;
            }
        };

        if conversations.is_empty() {
            println!("\n{YELLOW}No conversations found.{RESET}");
            return;
        }

        println!("\n{BOLD}📋 Recent Conversations:{RESET}");
        println!("{DIM}{}{RESET}", "─".repeat(60));
        for conversation in &conversations {
            let marker = if Some(conversation.id.as_str())
                == self.state.current_conversation_id.as_deref()
            {
                format!("{GREEN}●{RESET}")
            } else {
                format!("{DIM}○{RESET}")
            };
            println!("{marker} {CYAN}{}{RESET}", conversation.id);
            println!(
                "  {DIM}Updated: {}{RESET}\n",
                conversation.updated_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }

    async fn load_conversation(&mut self, lines: &mut Lines<BufReader<Stdin>>) {
        eprint!("\n{YELLOW}Enter conversation ID:{RESET} ");
        let id = match lines.next_line().await {
            Ok(Some(line)) => line.trim().to_string(),
            _ => return,
        };
        if id.is_empty() {
            return;
        }

        match self.manager.load(&mut self.state, &id).await {
            Ok(LoadOutcome::Loaded(_)) => {
                println!("\n{GREEN}✓{RESET} Loaded conversation: {CYAN}{id}{RESET}");
                self.show_history().await;
            }
            Ok(LoadOutcome::NotFound) => {
                println!("{RED}❌ Conversation not found: {id}{RESET}");
            }
            Err(e) => println!("{RED}❌ Error loading conversation:{RESET} {e}"),
        }
    }

    async fn show_history(&mut self) {
        let messages = match self.manager.history(&self.state).await {
            Ok(Some(messages)) => messages,
            Ok(None) => {
                println!("\n{YELLOW}⚠ No active conversation. Use /new to start one.{RESET}");
                return;
            }
            Err(e) => {
                println!("{RED}❌ Error showing history:{RESET} {e}");
                return;
            }
        };

        if messages.is_empty() {
            println!("\n{YELLOW}No messages in this conversation yet.{RESET}");
            return;
        }

        println!("\n{BOLD}💬 Conversation History:{RESET}");
        println!("{DIM}{}{RESET}", "─".repeat(60));
        for msg in &messages {
            let timestamp = msg.created_at.format("%H:%M:%S");
            match msg.role {
                Role::User => println!("\n{BLUE}[{timestamp}] You:{RESET}\n{}", msg.content),
                Role::Assistant => {
                    println!("\n{MAGENTA}[{timestamp}] Agent:{RESET}\n{}", msg.content)
                }
                Role::System => {}
            }
        }
        println!("\n{DIM}{}{RESET}", "─".repeat(60));
    }

    async fn send_message(&mut self, text: &str) {
        eprintln!("\n{MAGENTA}🤔 Agent is thinking...{RESET}");

        match self.manager.send(&mut self.state, text).await {
            Ok(SendOutcome::Reply(reply)) => {
                println!("\n{MAGENTA}🤖 Agent:{RESET}\n{reply}");
            }
            Ok(SendOutcome::NoConversation) => {
                println!("\n{YELLOW}⚠ No active conversation. Use /new to start one.{RESET}");
            }
            Err(e) => println!("\n{RED}❌ Error:{RESET} {e}"),
        }
    }

    fn print_header(&self) {
        println!("{BOLD}{MAGENTA}╔═══════════════════════════════════════════════════════════╗{RESET}");
        println!("{BOLD}{MAGENTA}║                 🤖 Agent TUI Playground                   ║{RESET}");
        println!("{BOLD}{MAGENTA}╚═══════════════════════════════════════════════════════════╝{RESET}");
        println!();
        println!("{DIM}User: {}{RESET}", self.state.user_id);
        if let Some(ref id) = self.state.current_conversation_id {
            println!("{DIM}Conversation: {id}{RESET}");
        }
        println!();
        println!("{YELLOW}Commands:{RESET}");
        println!("  {GREEN}/new{RESET}      - Start a new conversation");
        println!("  {GREEN}/list{RESET}     - List all conversations");
        println!("  {GREEN}/load{RESET}     - Load a conversation by ID");
        println!("  {GREEN}/history{RESET}  - Show current conversation history");
        println!("  {GREEN}/clear{RESET}    - Clear the screen");
        println!("  {GREEN}/help{RESET}     - Show this help message");
        println!("  {GREEN}/exit{RESET}     - Exit the application");
        println!("{DIM}{}{RESET}", "─".repeat(60));
    }
}

fn clear_screen() {
    print!("\x1b[2J\x1b[H");
}
