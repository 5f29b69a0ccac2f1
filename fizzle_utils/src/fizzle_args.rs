use argh::FromArgs;
use std::sync::LazyLock;

const DEFAULT_SHADOW_MAP_SIZE: u32 = 2048;

/// Runtime switches picked up from the process command line.
#[derive(Default, FromArgs)]
pub struct FizzleArgs {
    #[argh(switch, hidden_help)]
    pub no_shadows: bool,

    #[argh(option, hidden_help)]
    pub shadow_map_size: Option<u32>,
}

impl FizzleArgs {
    fn init() -> Option<FizzleArgs> {
        let mut args = std::env::args();
        let cmd_name = args.next()?;
        let args: Vec<String> = args.collect();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        Self::parse(&cmd_name, &args)
    }

    fn parse(cmd_name: &str, args: &[&str]) -> Option<FizzleArgs> {
        FizzleArgs::from_args(&[cmd_name], args).ok()
    }

    pub fn get() -> &'static FizzleArgs {
        static INSTANCE: LazyLock<FizzleArgs> =
            LazyLock::new(|| FizzleArgs::init().unwrap_or_default());
        &INSTANCE
    }

    pub fn default_shadow_map_size() -> u32 {
        FizzleArgs::get()
            .shadow_map_size
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_SHADOW_MAP_SIZE)
    }
}
