//! Clasificador de incidencias por palabras clave.
//!
//! La consulta se pasa a minúsculas y se parte por espacios. Una categoría
//! coincide si alguna de sus palabras clave está contenida en algún token
//! ("leaking" contiene "leak"). Si coinciden varias, gana la primera en
//! orden de declaración: Plumbing, Internet, Power.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCategory {
    Plumbing,
    Internet,
    Power,
}

impl IssueCategory {
    /// Orden de declaración; también es el orden de desempate.
    pub const ALL: [IssueCategory; 3] = [Self::Plumbing, Self::Internet, Self::Power];

    pub fn name(self) -> &'static str {
        match self {
            Self::Plumbing => "plumbing",
            Self::Internet => "internet",
            Self::Power => "power",
        }
    }

    pub fn default_keywords(self) -> &'static [&'static str] {
        match self {
            Self::Plumbing => &["pipe", "leak", "clog", "water", "drain", "faucet"],
            Self::Internet => &["internet", "wifi", "wi-fi", "connectivity", "router", "signal"],
            Self::Power => &["power", "outage", "electricity", "breaker", "fluctuation", "overload"],
        }
    }

    /// Solución predefinida de la categoría.
    pub fn canned_solution(self) -> &'static str {
        match self {
            Self::Plumbing => concat!(
                "It seems like you're dealing with a leaking pipe. Here are some steps you can follow:\n",
                "1) Turn off the water supply to prevent further leakage.\n",
                "2) Inspect the pipe to locate the leak.\n",
                "3) Use pipe tape, a pipe clamp, or epoxy putty to seal the leak temporarily.\n",
                "4) Contact a plumber if the leak persists or if you're unable to fix it on your own."
            ),
            Self::Internet => concat!(
                "It seems like you're experiencing internet connectivity issues. Here are some steps you can try:\n",
                "1) Check if the Wi-Fi router is powered on and connected properly.\n",
                "2) Restart the router and modem by unplugging them for 10 seconds, then plugging them back in.\n",
                "3) Ensure that your device is connected to the correct network.\n",
                "4) If the issue persists, contact your Internet Service Provider (ISP) to check for outages."
            ),
            Self::Power => concat!(
                "It seems like you're dealing with a power outage. Here are some steps to follow:\n",
                "1) Check if the power is out in your entire building or just your unit.\n",
                "2) Look at your circuit breaker to see if any switches are tripped.\n",
                "3) If a breaker is tripped, reset it by turning it off and then back on.\n",
                "4) If power doesn't return, contact your local electricity provider for assistance."
            ),
        }
    }
}

/// Una categoría con sus palabras clave ya normalizadas.
#[derive(Debug, Clone)]
struct CategoryRule {
    category: IssueCategory,
    keywords: Vec<String>,
}

/// Tabla de reglas; se construye una vez al arrancar y sólo se lee después.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<CategoryRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::with_rules(
            IssueCategory::ALL
                .iter()
                .map(|c| (*c, c.default_keywords().iter().map(|k| k.to_string()).collect())),
        )
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reglas personalizadas. El orden de entrada fija el desempate.
    /// Las palabras clave vacías se descartan: coincidirían con todo.
    pub fn with_rules<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = (IssueCategory, Vec<String>)>,
    {
        let rules = rules
            .into_iter()
            .map(|(category, keywords)| CategoryRule {
                category,
                keywords: keywords
                    .into_iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    /// Todas las categorías que coinciden, en orden de declaración y sin repetir.
    pub fn classify(&self, query: &str) -> Vec<IssueCategory> {
        let normalized = query.to_lowercase();
        let tokens: Vec<&str> = normalized.split_whitespace().collect();

        let mut matched = Vec::new();
        for rule in &self.rules {
            if matched.contains(&rule.category) {
                continue;
            }
            let hit = rule
                .keywords
                .iter()
                .any(|kw| tokens.iter().any(|tok| tok.contains(kw.as_str())));
            if hit {
                matched.push(rule.category);
            }
        }
        matched
    }

    /// Categoría ganadora tras el desempate.
    pub fn best_match(&self, query: &str) -> Option<IssueCategory> {
        self.classify(query).into_iter().next()
    }
}
