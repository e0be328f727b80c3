//! # B2B : navigateur minimal sur Servo
//!
//! Une fenêtre, une vue web, une barre d'outils. Le texte saisi est classé
//! en URL ou recherche ; une URL n'est ouverte que si une requête HEAD
//! répond 200, sinon la saisie part au moteur de recherche.
//!
//! ## Logique (sans dépendance graphique)
//!
//! - [`address`] : classification URL / recherche et URL de recherche.
//! - [`probe`] : sonde HEAD, exécutée hors du thread principal.
//! - [`navigation`] : contrôleur ; accueil, saisie, retour sonde, échec de
//!   chargement, bascule du mode privé.
//! - [`urlbar`] : édition de texte de la barre d'adresse.
//! - [`privacy`] : mode privé et moteur de filtres `adblock`.
//! - [`view`] : contrat entre le contrôleur et la vue web.
//! - [`toolbar`] : disposition et hit-testing des boutons.
//! - [`pages`] : page d'erreur et page de réglages.
//! - [`config`], [`error`] : configuration TOML et type d'erreur.
//!
//! ## Intégration
//!
//! - [`browser`] : boucle Winit, pattern "Two-Phase App".
//! - [`servo_glue`] : waker, `WebViewDelegate`, `ServoView`.
//! - [`chrome`], [`rendering`] : rendu GL de la barre, contextes surfman.
//! - [`keyutils`], [`preferences`], [`resources`] : clavier, préférences
//!   Servo, dossier de ressources.

pub mod address;
pub mod browser;
pub mod chrome;
pub mod config;
pub mod error;
pub mod keyutils;
pub mod navigation;
pub mod pages;
pub mod preferences;
pub mod privacy;
pub mod probe;
pub mod rendering;
pub mod resources;
pub mod servo_glue;
pub mod toolbar;
pub mod urlbar;
pub mod view;
